use std::{fmt, hash::Hash, sync::Arc};

use uuid::Uuid;

/// Identifier for a condition registered with a verification.
///
/// Returned by [`VerificationBuilder::condition`](crate::VerificationBuilder::condition).
/// Use a `ConditionId` to:
///
/// - Target the condition in a constraint (`c.condition(&id)`)
/// - Identify which feed produced an instance in diagnostics
///
/// Identity is the component name, the human-readable description, and a
/// unique id minted at registration, so two registrations of the same
/// underlying condition remain distinct. `ConditionId` is cheap to clone
/// (string comparison with a fast-path for pointer equality when ids share
/// the same allocation).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionId {
    component: Arc<str>,
    description: Arc<str>,
    id: Uuid,
}

impl ConditionId {
    pub fn new(component: &str, description: &str) -> Self {
        Self {
            component: Arc::from(component),
            description: Arc::from(description),
            id: Uuid::new_v4(),
        }
    }

    /// Name of the component that reports this condition.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Human-readable description of the condition.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Unique id minted when the condition was registered.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl PartialEq for ConditionId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && (Arc::ptr_eq(&self.component, &other.component) || self.component == other.component)
            && (Arc::ptr_eq(&self.description, &other.description)
                || self.description == other.description)
    }
}

impl Eq for ConditionId {}

impl Hash for ConditionId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.component.hash(state);
        self.description.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.description)
    }
}
