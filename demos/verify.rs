//! End-to-end verification against simulated components.
//!
//! Two component stubs report conditions over channels while the verifier
//! watches: a web stub reports an incoming request, then an
//! identity-provider stub reports the audit event the request should cause.
//!
//! Run with: cargo run --example verify

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use witness::{
    ConditionFeed, ConditionInstance, ConditionSpecification, Error, InstanceFactory, Result,
    VerificationBuilder,
};

/// Reports an occurrence for every message the simulated component sends
/// over its channel.
struct ChannelCondition {
    component: &'static str,
    description: &'static str,
    receiver: Mutex<Option<mpsc::Receiver<String>>>,
}

impl ChannelCondition {
    fn new(component: &'static str, description: &'static str, rx: mpsc::Receiver<String>) -> Self {
        Self {
            component,
            description,
            receiver: Mutex::new(Some(rx)),
        }
    }
}

#[async_trait]
impl ConditionSpecification for ChannelCondition {
    fn component_name(&self) -> &str {
        self.component
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn build(
        &self,
        factory: Arc<InstanceFactory>,
        _cancel: &CancellationToken,
    ) -> Result<Box<dyn ConditionFeed>> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::external(std::io::Error::other("channel already claimed")))?;
        Ok(Box::new(ChannelFeed { receiver, factory }))
    }
}

struct ChannelFeed {
    receiver: mpsc::Receiver<String>,
    factory: Arc<InstanceFactory>,
}

#[async_trait]
impl ConditionFeed for ChannelFeed {
    async fn wait_for_instances(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConditionInstance>> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            received = self.receiver.recv() => match received {
                Some(id) => {
                    let mut batch = vec![self.factory.create(&id)];
                    while let Ok(id) = self.receiver.try_recv() {
                        batch.push(self.factory.create(&id));
                    }
                    Ok(batch)
                }
                None => {
                    // Component hung up; nothing more will ever arrive.
                    cancel.cancelled().await;
                    Err(Error::Cancelled)
                }
            },
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.receiver.close();
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result {
    let (web_tx, web_rx) = mpsc::channel(8);
    let (idp_tx, idp_rx) = mpsc::channel(8);

    let mut verify = VerificationBuilder::new();
    verify.inactivity_timeout(Duration::from_secs(2));

    let request = verify.condition(ChannelCondition::new("web", "request received", web_rx));
    let audit = verify.condition(ChannelCondition::new("idp", "audit written", idp_rx));

    verify.expect(|e| {
        e.constraint(|c| c.condition(&request).before(Duration::from_millis(500)))
            .then(|g| g.constraint(|c| c.condition(&audit).before(Duration::from_secs(1))))
    })?;

    // Simulate the environment under test.
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = web_tx.send("GET /token".to_string()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = idp_tx.send("TokenIssued".to_string()).await;
    });

    let result = verify.build()?.verify().await?;

    println!("expectations met: {}", result.expectations_met());
    for (index, expectation) in result.expectations().iter().enumerate() {
        println!(
            "  expectation {index}: completed={} outcome={}",
            expectation.is_completed(),
            expectation.outcome()
        );
    }
    Ok(())
}
