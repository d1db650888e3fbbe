use std::{collections::HashSet, sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    Clock, ConditionId, ConditionSpecification, Error, ExpectationBuilder, InstanceFactory,
    MonotonicClock, Result, Verifier, expectation::ExpectationEvaluator, internal::ExpectationRun,
};

/// Declares what a verification run should observe.
///
/// Register the conditions your mock components can report, declare one or
/// more expectations over them, then [`build`](Self::build) a [`Verifier`].
///
/// # Example
///
/// ```ignore
/// let mut verify = VerificationBuilder::new();
/// let request = verify.condition(server.request_received("/token"));
/// let audit = verify.condition(idp.audit_event("TokenIssued"));
///
/// verify.expect(|e| {
///     e.constraint(|c| c.condition(&request).before(ms(150)))
///         .then(|g| g.constraint(|c| c.condition(&audit).before(ms(500))))
/// })?;
///
/// let result = verify.build()?.verify().await?;
/// assert!(result.expectations_met());
/// ```
///
/// Validation is fail-fast: a constraint that names no condition, targets a
/// condition registered elsewhere, or carries an inverted window is rejected
/// by [`expect`](Self::expect) before anything runs.
pub struct VerificationBuilder {
    clock: Arc<dyn Clock>,
    inactivity_timeout: Duration,
    short_circuit: bool,
    conditions: Vec<(ConditionId, Arc<dyn ConditionSpecification>)>,
    registered: HashSet<Uuid>,
    expectations: Vec<ExpectationEvaluator>,
}

impl VerificationBuilder {
    /// Maximum wait with no new instances before a run gives up.
    pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self {
            clock: Arc::new(MonotonicClock),
            inactivity_timeout: Self::DEFAULT_INACTIVITY_TIMEOUT,
            short_circuit: false,
            conditions: Vec::new(),
            registered: HashSet::new(),
            expectations: Vec::new(),
        }
    }

    /// Register a condition and mint its identifier.
    ///
    /// The identifier carries the specification's component name and
    /// description plus a unique id, so registering the same specification
    /// twice yields two distinct conditions.
    pub fn condition(&mut self, spec: impl ConditionSpecification + 'static) -> ConditionId {
        let id = ConditionId::new(spec.component_name(), spec.description());
        self.registered.insert(id.id());
        self.conditions.push((id.clone(), Arc::new(spec)));
        id
    }

    /// Declare one expectation.
    ///
    /// The closure assembles an AND-group of constraints, optionally chained
    /// to follow-on groups via [`then`](ExpectationBuilder::then).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConditionRequired`], [`Error::UnknownCondition`],
    /// [`Error::EmptyExpectation`], or [`Error::InvalidWindow`] when the
    /// assembled expectation is malformed.
    pub fn expect(
        &mut self,
        f: impl FnOnce(ExpectationBuilder) -> ExpectationBuilder,
    ) -> Result<()> {
        let evaluator = f(ExpectationBuilder::new()).build(&self.registered)?;
        self.expectations.push(evaluator);
        Ok(())
    }

    /// Override the default 30-second inactivity timeout.
    pub fn inactivity_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// Abort remaining expectations as soon as one completes as not met.
    pub fn short_circuit(&mut self, enabled: bool) -> &mut Self {
        self.short_circuit = enabled;
        self
    }

    /// Replace the time source (defaults to [`MonotonicClock`]).
    pub fn clock(&mut self, clock: Arc<dyn Clock>) -> &mut Self {
        self.clock = clock;
        self
    }

    /// Build the verifier.
    ///
    /// Each expectation gets its own instance factory and, at verify time,
    /// its own feeds built from every registered condition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoExpectations`] when nothing was declared via
    /// [`expect`](Self::expect).
    pub fn build(self) -> Result<Verifier> {
        if self.expectations.is_empty() {
            return Err(Error::NoExpectations);
        }
        let runs = self
            .expectations
            .into_iter()
            .map(|evaluator| {
                ExpectationRun::new(
                    self.inactivity_timeout,
                    self.conditions.clone(),
                    evaluator,
                    Arc::new(InstanceFactory::new(self.clock.clone())),
                )
            })
            .collect();
        Ok(Verifier::new(self.short_circuit, runs))
    }
}

impl Default for VerificationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VerificationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationBuilder")
            .field("inactivity_timeout", &self.inactivity_timeout)
            .field("short_circuit", &self.short_circuit)
            .field("conditions", &self.conditions.len())
            .field("expectations", &self.expectations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConditionId;
    use crate::testing::ScriptedCondition;

    #[test]
    fn expect_rejects_constraints_without_a_condition() {
        let mut verify = VerificationBuilder::new();
        let err = verify
            .expect(|e| e.constraint(|c| c.before(Duration::from_millis(100))))
            .unwrap_err();
        assert_eq!(err, Error::ConditionRequired);
    }

    #[test]
    fn expect_rejects_conditions_from_another_registration() {
        let mut verify = VerificationBuilder::new();
        let foreign = ConditionId::new("web", "request received");
        let err = verify
            .expect(|e| e.constraint(|c| c.condition(&foreign)))
            .unwrap_err();
        assert_eq!(err, Error::UnknownCondition(foreign));
    }

    #[test]
    fn expect_rejects_empty_groups() {
        let mut verify = VerificationBuilder::new();
        let err = verify.expect(|e| e).unwrap_err();
        assert_eq!(err, Error::EmptyExpectation);
    }

    #[test]
    fn build_requires_at_least_one_expectation() {
        let mut verify = VerificationBuilder::new();
        verify.condition(ScriptedCondition::new("web", "request received"));
        let err = verify.build().unwrap_err();
        assert_eq!(err, Error::NoExpectations);
    }

    #[test]
    fn registering_the_same_specification_twice_yields_distinct_conditions() {
        let mut verify = VerificationBuilder::new();
        let first = verify.condition(ScriptedCondition::new("web", "request received"));
        let second = verify.condition(ScriptedCondition::new("web", "request received"));
        assert_ne!(first, second);
    }
}
