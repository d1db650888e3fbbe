use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{ConditionFeed, ConditionSpecification, Error, InstanceFactory, Result};

/// A condition specification whose feed always fails to build.
///
/// For exercising partial-failure cleanup: when one condition of a run
/// refuses to build, the feeds that did build must still be closed before
/// the failure propagates.
#[derive(Debug)]
pub struct BrokenCondition {
    component: String,
    description: String,
}

impl BrokenCondition {
    pub fn new(component: &str, description: &str) -> Self {
        Self {
            component: component.to_string(),
            description: description.to_string(),
        }
    }
}

#[async_trait]
impl ConditionSpecification for BrokenCondition {
    fn component_name(&self) -> &str {
        &self.component
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn build(
        &self,
        _factory: Arc<InstanceFactory>,
        _cancel: &CancellationToken,
    ) -> Result<Box<dyn ConditionFeed>> {
        Err(Error::external(std::io::Error::other(
            "condition listener refused to start",
        )))
    }
}
