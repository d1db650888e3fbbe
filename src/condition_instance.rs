use std::{sync::Arc, time::Duration};

/// One timestamped occurrence of a condition.
///
/// `when` is the offset from the moment verification started, not wall-clock
/// time, so constraints can be expressed as offsets ("after 100ms"). A `when`
/// of exactly zero means "no activity yet"; the verifier never evaluates
/// such instances against constraints.
///
/// Produce instances through [`InstanceFactory`](crate::InstanceFactory),
/// which computes the offset against the run's zero-point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionInstance {
    when: Duration,
    id: Arc<str>,
}

impl ConditionInstance {
    /// Create an instance that occurred `when` after the verification start.
    ///
    /// `id` is the feed-local occurrence identifier; pass `""` when the feed
    /// has nothing meaningful to report.
    pub fn new(when: Duration, id: &str) -> Self {
        Self {
            when,
            id: Arc::from(id),
        }
    }

    /// Offset from the verification start at which the condition occurred.
    pub fn when(&self) -> Duration {
        self.when
    }

    /// Feed-local occurrence identifier, empty when unset.
    pub fn id(&self) -> &str {
        &self.id
    }
}
