//! Failing fast across several expectations.
//!
//! Two expectations watch a component that never reports anything. One has
//! no deadline and would wait out the full inactivity timeout; the other
//! fails at its 100ms window. With short-circuit enabled, the run ends as
//! soon as the fast failure resolves, and the slow expectation reports as
//! inconclusive.
//!
//! Run with: cargo run --example short_circuit

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use witness::{
    ConditionFeed, ConditionInstance, ConditionSpecification, Error, InstanceFactory, Result,
    VerificationBuilder,
};

/// A condition that never occurs.
struct SilentCondition;

#[async_trait]
impl ConditionSpecification for SilentCondition {
    fn component_name(&self) -> &str {
        "queue"
    }

    fn description(&self) -> &str {
        "message consumed"
    }

    async fn build(
        &self,
        _factory: Arc<InstanceFactory>,
        _cancel: &CancellationToken,
    ) -> Result<Box<dyn ConditionFeed>> {
        Ok(Box::new(SilentFeed))
    }
}

struct SilentFeed;

#[async_trait]
impl ConditionFeed for SilentFeed {
    async fn wait_for_instances(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConditionInstance>> {
        cancel.cancelled().await;
        Err(Error::Cancelled)
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result {
    let mut verify = VerificationBuilder::new();
    verify
        .inactivity_timeout(Duration::from_secs(10))
        .short_circuit(true);

    let consumed = verify.condition(SilentCondition);

    // No deadline: only the inactivity timeout could resolve this one.
    verify.expect(|e| e.constraint(|c| c.condition(&consumed)))?;
    // Fails fast once its window closes.
    verify.expect(|e| e.constraint(|c| c.condition(&consumed).before(Duration::from_millis(100))))?;

    let begin = Instant::now();
    let result = verify.build()?.verify().await?;
    let took = begin.elapsed();

    println!("expectations met: {} (after {took:?})", result.expectations_met());
    for (index, expectation) in result.expectations().iter().enumerate() {
        println!(
            "  expectation {index}: completed={} outcome={}",
            expectation.is_completed(),
            expectation.outcome()
        );
    }
    Ok(())
}
