use std::fmt;

/// Tri-state verdict of an expectation or constraint evaluation.
///
/// Evaluation is incremental: an evaluator stays [`Undetermined`](Self::Undetermined)
/// until enough instances (or enough elapsed time) have been observed to
/// decide either way. Only a completed [`ExpectationResult`](crate::ExpectationResult)
/// carries a final outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// Not enough information yet to decide.
    Undetermined,
    /// The expected conditions occurred within their windows.
    Met,
    /// A window closed without its condition, or the run timed out.
    NotMet,
}

impl Outcome {
    /// Returns `true` only for [`Outcome::Met`].
    pub fn is_met(&self) -> bool {
        matches!(self, Outcome::Met)
    }

    /// Collapses the tri-state into an `Option`: `None` while undetermined.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Outcome::Undetermined => None,
            Outcome::Met => Some(true),
            Outcome::NotMet => Some(false),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Undetermined => "undetermined",
            Outcome::Met => "met",
            Outcome::NotMet => "not met",
        };
        write!(f, "{s}")
    }
}
