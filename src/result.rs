use crate::Outcome;

/// Result of one expectation's evaluation.
///
/// Produced by every evaluation step; only a completed result is final. A
/// short-circuited run reports the expectations it abandoned as
/// inconclusive: not completed, outcome [`Outcome::Undetermined`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpectationResult {
    completed: bool,
    outcome: Outcome,
}

impl ExpectationResult {
    pub(crate) fn completed(outcome: Outcome) -> Self {
        Self {
            completed: true,
            outcome,
        }
    }

    pub(crate) fn pending() -> Self {
        Self {
            completed: false,
            outcome: Outcome::Undetermined,
        }
    }

    /// Whether evaluation reached a final verdict.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// The verdict; [`Outcome::Undetermined`] while incomplete.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

/// Aggregate result of a verification run.
///
/// Holds one [`ExpectationResult`] per declared expectation, in declaration
/// order. [`expectations_met`](Self::expectations_met) is `true` only when
/// every expectation completed with [`Outcome::Met`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerificationResult {
    expectations_met: bool,
    expectations: Vec<ExpectationResult>,
}

impl VerificationResult {
    pub(crate) fn new(expectations: Vec<ExpectationResult>) -> Self {
        let expectations_met = expectations
            .iter()
            .all(|r| r.is_completed() && r.outcome().is_met());
        Self {
            expectations_met,
            expectations,
        }
    }

    pub fn expectations_met(&self) -> bool {
        self.expectations_met
    }

    /// Per-expectation results, in declaration order.
    pub fn expectations(&self) -> &[ExpectationResult] {
        &self.expectations
    }

    /// Export the verification outcome as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns any serialization error produced by `serde_json`.
    #[cfg(feature = "serde")]
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_requires_every_expectation_met() {
        let met = VerificationResult::new(vec![
            ExpectationResult::completed(Outcome::Met),
            ExpectationResult::completed(Outcome::Met),
        ]);
        assert!(met.expectations_met());

        let failed = VerificationResult::new(vec![
            ExpectationResult::completed(Outcome::Met),
            ExpectationResult::completed(Outcome::NotMet),
        ]);
        assert!(!failed.expectations_met());

        let inconclusive = VerificationResult::new(vec![
            ExpectationResult::completed(Outcome::Met),
            ExpectationResult::pending(),
        ]);
        assert!(!inconclusive.expectations_met());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn to_json_round_trips() {
        let result = VerificationResult::new(vec![ExpectationResult::completed(Outcome::Met)]);
        let json = result.to_json().unwrap();
        let parsed: VerificationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
