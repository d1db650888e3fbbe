use std::{collections::HashSet, time::Duration};

use uuid::Uuid;

use crate::{ConditionId, Error, FeedInstance, Outcome, Result};

/// Configurator for one constraint: a condition plus an optional time window.
///
/// Passed to the closure given to
/// [`ExpectationBuilder::constraint`](crate::ExpectationBuilder::constraint).
/// The target condition is mandatory; the window verbs are optional and
/// compose ([`after`](Self::after) + [`before`](Self::before) is equivalent
/// to [`between`](Self::between)).
///
/// # Example
///
/// ```ignore
/// e.constraint(|c| c.condition(&request).between(ms(100), ms(150)))
/// ```
#[derive(Debug, Default)]
pub struct ConstraintBuilder {
    condition: Option<ConditionId>,
    after: Option<Duration>,
    before: Option<Duration>,
}

impl ConstraintBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Target condition that must occur.
    pub fn condition(mut self, condition: &ConditionId) -> Self {
        self.condition = Some(condition.clone());
        self
    }

    /// The condition counts only at or after this offset.
    pub fn after(mut self, time: Duration) -> Self {
        self.after = Some(time);
        self
    }

    /// The condition must occur no later than this offset.
    pub fn before(mut self, time: Duration) -> Self {
        self.before = Some(time);
        self
    }

    /// Shorthand for [`after`](Self::after)`(start)` + [`before`](Self::before)`(end)`.
    pub fn between(mut self, start: Duration, end: Duration) -> Self {
        self.after = Some(start);
        self.before = Some(end);
        self
    }

    pub(crate) fn build(self, registered: &HashSet<Uuid>) -> Result<ConstraintEvaluator> {
        let condition = self.condition.ok_or(Error::ConditionRequired)?;
        if !registered.contains(&condition.id()) {
            return Err(Error::UnknownCondition(condition));
        }
        if let (Some(start), Some(end)) = (self.after, self.before)
            && end < start
        {
            return Err(Error::InvalidWindow { start, end });
        }
        Ok(ConstraintEvaluator::new(condition, self.after, self.before))
    }
}

/// Evaluates whether occurrences of one condition satisfy a time window.
///
/// Monotonic: once completed it never changes its verdict, whatever else is
/// evaluated afterwards.
#[derive(Debug)]
pub(crate) struct ConstraintEvaluator {
    condition: ConditionId,
    after: Option<Duration>,
    before: Option<Duration>,
    completed: bool,
    outcome: Outcome,
}

impl ConstraintEvaluator {
    pub(crate) fn new(
        condition: ConditionId,
        after: Option<Duration>,
        before: Option<Duration>,
    ) -> Self {
        Self {
            condition,
            after,
            before,
            completed: false,
            outcome: Outcome::Undetermined,
        }
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Upper-bound deadline while the constraint is still open.
    pub(crate) fn deadline(&self) -> Option<Duration> {
        if self.completed { None } else { self.before }
    }

    pub(crate) fn evaluate_instance(&mut self, fi: &FeedInstance) {
        if self.completed {
            return;
        }

        let when = fi.instance().when();
        if fi.condition() != &self.condition {
            // An unrelated instance past the upper bound proves the window
            // closed without the expected condition.
            if let Some(before) = self.before
                && when > before
            {
                self.complete(Outcome::NotMet);
            }
            return;
        }

        if let Some(after) = self.after
            && when < after
        {
            // Too early; the window is still open.
            return;
        }

        match self.before {
            Some(before) if when > before => self.complete(Outcome::NotMet),
            _ => self.complete(Outcome::Met),
        }
    }

    pub(crate) fn evaluate_elapsed(&mut self, time: Duration) {
        if self.completed {
            return;
        }
        if let Some(before) = self.before
            && time > before
        {
            self.complete(Outcome::NotMet);
        }
    }

    pub(crate) fn timeout(&mut self) {
        if !self.completed {
            self.complete(Outcome::NotMet);
        }
    }

    fn complete(&mut self, outcome: Outcome) {
        self.completed = true;
        self.outcome = outcome;
    }
}
