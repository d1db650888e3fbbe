use std::{sync::Arc, time::Duration};

use crate::ConditionId;

/// The single error type for all witness operations.
///
/// Every fallible API returns `witness::Result<T>` (alias for
/// `Result<T, witness::Error>`). Only infrastructure failures surface here:
/// a constraint or expectation that fails to be met is a normal
/// [`ExpectationResult`](crate::ExpectationResult), never an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("Constraint does not name a target condition.")]
    ConditionRequired,

    #[error("Condition '{0}' is not registered with this verification.")]
    UnknownCondition(ConditionId),

    #[error("Expectation group has no constraints.")]
    EmptyExpectation,

    #[error("Verification has no expectations.")]
    NoExpectations,

    #[error("Time window ends ({end:?}) before it starts ({start:?}).")]
    InvalidWindow { start: Duration, end: Duration },

    #[error("Instance timestamp precedes the verification start.")]
    InstanceBeforeStart,

    #[error("Verification was cancelled.")]
    Cancelled,

    #[error("Component error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),

    #[error("Internal verification error: {0}")]
    Internal(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap a component-reported failure, e.g. from a feed build.
    pub fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::External(Arc::new(e))
    }

    pub(crate) fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Internal(Arc::new(e))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ConditionRequired, Self::ConditionRequired) => true,
            (Self::UnknownCondition(a), Self::UnknownCondition(b)) => a == b,
            (Self::EmptyExpectation, Self::EmptyExpectation) => true,
            (Self::NoExpectations, Self::NoExpectations) => true,
            (
                Self::InvalidWindow { start: s1, end: e1 },
                Self::InvalidWindow { start: s2, end: e2 },
            ) => s1 == s2 && e1 == e2,
            (Self::InstanceBeforeStart, Self::InstanceBeforeStart) => true,
            (Self::Cancelled, Self::Cancelled) => true,
            (Self::External(a), Self::External(b)) => Arc::ptr_eq(a, b),
            (Self::Internal(a), Self::Internal(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Error {}
