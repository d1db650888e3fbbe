use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    select,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;

use crate::{
    ConditionFeed, ConditionInstance, ConditionSpecification, Error, InstanceFactory, Result,
    testing::FeedProbe,
};

/// A condition specification that replays a fixed script.
///
/// Each scripted batch is delivered a configured delay after its feed is
/// built, carrying instances with explicit `when` stamps, so tests control
/// both the physical arrival order and the logical chronology
/// independently. A condition with no batches never reports anything,
/// which is useful for exercising inactivity timeouts and short-circuiting.
///
/// Every feed built from the specification replays the same script and
/// reports to the shared [`FeedProbe`].
#[derive(Debug)]
pub struct ScriptedCondition {
    component: String,
    description: String,
    steps: Vec<Step>,
    probe: FeedProbe,
}

#[derive(Debug, Clone)]
struct Step {
    deliver_at: Duration,
    instances: Vec<ConditionInstance>,
}

impl ScriptedCondition {
    pub fn new(component: &str, description: &str) -> Self {
        Self {
            component: component.to_string(),
            description: description.to_string(),
            steps: Vec::new(),
            probe: FeedProbe::new(),
        }
    }

    /// Deliver one instance stamped `when`, `deliver_at` after the feed is
    /// built.
    pub fn instance_at(self, deliver_at: Duration, when: Duration) -> Self {
        self.batch_at(deliver_at, &[when])
    }

    /// Deliver a batch of instances with the given `when` stamps,
    /// `deliver_at` after the feed is built.
    pub fn batch_at(mut self, deliver_at: Duration, stamps: &[Duration]) -> Self {
        self.steps.push(Step {
            deliver_at,
            instances: stamps
                .iter()
                .map(|when| ConditionInstance::new(*when, ""))
                .collect(),
        });
        self
    }

    /// Handle onto the build/close counters shared by every feed this
    /// specification produces.
    pub fn probe(&self) -> FeedProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl ConditionSpecification for ScriptedCondition {
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
        self.probe.record_build();
        Ok(Box::new(ScriptedFeed {
            base: Instant::now(),
            steps: self.steps.clone().into(),
            probe: self.probe.clone(),
        }))
    }
}

struct ScriptedFeed {
    base: Instant,
    steps: VecDeque<Step>,
    probe: FeedProbe,
}

#[async_trait]
impl ConditionFeed for ScriptedFeed {
    async fn wait_for_instances(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConditionInstance>> {
        let Some(step) = self.steps.pop_front() else {
            // Script exhausted: behave like a quiet component.
            cancel.cancelled().await;
            return Err(Error::Cancelled);
        };
        select! {
            biased;
            _ = cancel.cancelled() => {
                self.steps.push_front(step);
                Err(Error::Cancelled)
            }
            _ = sleep_until(self.base + step.deliver_at) => Ok(step.instances),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.probe.record_close();
        Ok(())
    }
}
