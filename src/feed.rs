use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{ConditionInstance, InstanceFactory, Result};

/// Live asynchronous source of [`ConditionInstance`]s for one registration.
///
/// Built by a [`ConditionSpecification`] when verification begins. The
/// engine drives each feed from exactly one in-flight
/// [`wait_for_instances`](Self::wait_for_instances) call at a time and calls
/// [`close`](Self::close) exactly once per run, on every exit path.
///
/// Implementations do not need to order instances against other feeds;
/// the engine merges all feeds into a single time-ordered sequence.
#[async_trait]
pub trait ConditionFeed: Send {
    /// Suspend until at least one new occurrence exists, then return the
    /// batch.
    ///
    /// Restartable: repeated calls keep waiting for further batches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`](crate::Error::Cancelled) when `cancel`
    /// is triggered before a batch is available, or
    /// [`Error::External`](crate::Error::External) when the upstream
    /// listener faults.
    async fn wait_for_instances(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConditionInstance>>;

    /// Release the upstream listener.
    ///
    /// Must tolerate being called after a failed or cancelled wait. A second
    /// call must be a no-op, not an error.
    async fn close(&mut self) -> Result<()>;
}

/// Describes a condition a component can report, and builds its feed.
///
/// Implemented by mock components (web-request stubs, identity-provider
/// stubs, process hosts); the engine only consumes this contract. Register
/// a specification with
/// [`VerificationBuilder::condition`](crate::VerificationBuilder::condition),
/// which mints a [`ConditionId`](crate::ConditionId) from the component
/// name and description.
#[async_trait]
pub trait ConditionSpecification: Send + Sync {
    /// Name of the component that reports this condition.
    fn component_name(&self) -> &str;

    /// Human-readable description of what is being observed.
    fn description(&self) -> &str;

    /// Register a listener with the live component and return its feed.
    ///
    /// May be called multiple times per specification (once per
    /// expectation being verified), and each call must yield an
    /// independently-owned feed. Instances must be stamped through the
    /// supplied `factory` so their offsets share the run's zero-point.
    async fn build(
        &self,
        factory: Arc<InstanceFactory>,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn ConditionFeed>>;
}
