use std::{collections::HashSet, time::Duration};

use uuid::Uuid;

use crate::{ConstraintBuilder, Error, ExpectationResult, FeedInstance, Outcome, Result};

use crate::constraint::ConstraintEvaluator;

/// Configurator for one expectation: an AND-group of constraints, optionally
/// chained to follow-on groups.
///
/// Passed to the closure given to
/// [`VerificationBuilder::expect`](crate::VerificationBuilder::expect).
/// Every [`constraint`](Self::constraint) added to a group must be satisfied
/// for that group to resolve; [`then`](Self::then) appends a group that only
/// starts mattering once the current chain has resolved.
///
/// # Example
///
/// ```ignore
/// verify.expect(|e| {
///     e.constraint(|c| c.condition(&request).before(ms(150)))
///         .then(|g| g.constraint(|c| c.condition(&audit).before(ms(500))))
/// })?;
/// ```
#[derive(Debug, Default)]
pub struct ExpectationBuilder {
    constraints: Vec<ConstraintBuilder>,
    next: Option<Box<ExpectationBuilder>>,
}

impl ExpectationBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a constraint to this group.
    pub fn constraint(mut self, f: impl FnOnce(ConstraintBuilder) -> ConstraintBuilder) -> Self {
        self.constraints.push(f(ConstraintBuilder::new()));
        self
    }

    /// Append a sequential follow-on group to the end of the chain.
    pub fn then(mut self, f: impl FnOnce(ExpectationBuilder) -> ExpectationBuilder) -> Self {
        self.next = Some(Box::new(match self.next {
            Some(next) => next.then(f),
            None => f(ExpectationBuilder::new()),
        }));
        self
    }

    pub(crate) fn build(self, registered: &HashSet<Uuid>) -> Result<ExpectationEvaluator> {
        if self.constraints.is_empty() {
            return Err(Error::EmptyExpectation);
        }
        let constraints = self
            .constraints
            .into_iter()
            .map(|c| c.build(registered))
            .collect::<Result<Vec<_>>>()?;
        let next = match self.next {
            Some(next) => Some(Box::new(next.build(registered)?)),
            None => None,
        };
        Ok(ExpectationEvaluator::new(constraints, next))
    }
}

/// Evaluates an AND-group of constraints, chained to an optional follow-on
/// group.
///
/// The chain is a forward-only singly-linked list: input is evaluated
/// against the first unresolved group, and flows into the next group once
/// every constraint of the current one has completed as met. Once any call
/// yields a completed result, that result is cached and returned forever.
pub(crate) struct ExpectationEvaluator {
    constraints: Vec<ConstraintEvaluator>,
    next: Option<Box<ExpectationEvaluator>>,
    result: ExpectationResult,
}

impl ExpectationEvaluator {
    pub(crate) fn new(
        constraints: Vec<ConstraintEvaluator>,
        next: Option<Box<ExpectationEvaluator>>,
    ) -> Self {
        Self {
            constraints,
            next,
            result: ExpectationResult::pending(),
        }
    }

    /// Earliest upper-bound deadline among the chain's open constraints.
    ///
    /// `None` when nothing carries a deadline; the verifier then waits on
    /// the inactivity timeout alone.
    pub(crate) fn next_timer(&self) -> Option<Duration> {
        if self.result.is_completed() {
            return None;
        }
        if self.group_resolved() {
            return self.next.as_ref().and_then(|next| next.next_timer());
        }
        self.constraints.iter().filter_map(|c| c.deadline()).min()
    }

    pub(crate) fn evaluate_instance(&mut self, fi: &FeedInstance) -> ExpectationResult {
        if self.result.is_completed() {
            return self.result.clone();
        }
        if self.group_resolved() {
            return self.forward(|next| next.evaluate_instance(fi));
        }
        for constraint in self.constraints.iter_mut().filter(|c| !c.is_completed()) {
            constraint.evaluate_instance(fi);
        }
        self.try_complete()
    }

    pub(crate) fn evaluate_elapsed(&mut self, time: Duration) -> ExpectationResult {
        if self.result.is_completed() {
            return self.result.clone();
        }
        if self.group_resolved() {
            return self.forward(|next| next.evaluate_elapsed(time));
        }
        for constraint in self.constraints.iter_mut().filter(|c| !c.is_completed()) {
            constraint.evaluate_elapsed(time);
        }
        self.try_complete()
    }

    /// Force the chain to a verdict because the run went inactive.
    ///
    /// Always returns a completed result.
    pub(crate) fn timeout(&mut self) -> ExpectationResult {
        if self.result.is_completed() {
            return self.result.clone();
        }
        if self.group_resolved() {
            return self.forward(|next| next.timeout());
        }
        for constraint in self.constraints.iter_mut().filter(|c| !c.is_completed()) {
            constraint.timeout();
        }
        self.try_complete()
    }

    /// Whether this group is fully met and evaluation has moved on to the
    /// follow-on group.
    fn group_resolved(&self) -> bool {
        self.next.is_some()
            && self
                .constraints
                .iter()
                .all(|c| c.is_completed() && c.outcome().is_met())
    }

    fn forward(
        &mut self,
        f: impl FnOnce(&mut ExpectationEvaluator) -> ExpectationResult,
    ) -> ExpectationResult {
        let next = self
            .next
            .as_mut()
            .expect("resolved group always has a follow-on");
        let result = f(next);
        // Adopt the follow-on verdict only once it is final.
        if result.is_completed() {
            self.result = result;
        }
        self.result.clone()
    }

    fn try_complete(&mut self) -> ExpectationResult {
        if self.constraints.iter().all(|c| c.is_completed()) {
            if self.constraints.iter().any(|c| !c.outcome().is_met()) {
                self.result = ExpectationResult::completed(Outcome::NotMet);
            } else if self.next.is_none() {
                self.result = ExpectationResult::completed(Outcome::Met);
            }
            // All met with a follow-on group: stay pending, future input
            // flows into the follow-on.
        }
        self.result.clone()
    }
}

impl std::fmt::Debug for ExpectationEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpectationEvaluator")
            .field("constraints", &self.constraints.len())
            .field("chained", &self.next.is_some())
            .field("result", &self.result)
            .finish()
    }
}
