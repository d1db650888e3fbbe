use crate::{ConditionId, ConditionInstance};

/// A [`ConditionInstance`] paired with the condition that produced it.
///
/// This is the unit the evaluation tree consumes: the verifier tags every
/// instance with its feed's [`ConditionId`] before merging the feeds into a
/// single time-ordered sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedInstance {
    condition: ConditionId,
    instance: ConditionInstance,
}

impl FeedInstance {
    pub fn new(condition: ConditionId, instance: ConditionInstance) -> Self {
        Self {
            condition,
            instance,
        }
    }

    pub fn condition(&self) -> &ConditionId {
        &self.condition
    }

    pub fn instance(&self) -> &ConditionInstance {
        &self.instance
    }
}
