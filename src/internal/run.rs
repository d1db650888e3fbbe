use std::{sync::Arc, time::Duration};

use futures_util::future::join_all;
use tokio::{
    select,
    sync::mpsc::{self, Receiver, Sender},
    task::JoinSet,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;

use crate::{
    ConditionFeed, ConditionId, ConditionInstance, ConditionSpecification, Error, ExpectationResult,
    FeedInstance, InstanceFactory, Result, expectation::ExpectationEvaluator,
};

/// Capacity of the channel the feed pumps deliver batches into.
const FEED_CHANNEL_CAPACITY: usize = 64;

type Batch = (ConditionId, Vec<ConditionInstance>);

/// One expectation's verification: builds the feeds, merges their output
/// into chronological order, and races evaluation against timers.
///
/// Owned by [`Verifier`](crate::Verifier), which runs one `ExpectationRun`
/// per declared expectation.
pub(crate) struct ExpectationRun {
    inactivity_timeout: Duration,
    conditions: Vec<(ConditionId, Arc<dyn ConditionSpecification>)>,
    evaluator: ExpectationEvaluator,
    factory: Arc<InstanceFactory>,
}

impl ExpectationRun {
    pub(crate) fn new(
        inactivity_timeout: Duration,
        conditions: Vec<(ConditionId, Arc<dyn ConditionSpecification>)>,
        evaluator: ExpectationEvaluator,
        factory: Arc<InstanceFactory>,
    ) -> Self {
        Self {
            inactivity_timeout,
            conditions,
            evaluator,
            factory,
        }
    }

    /// Drive the expectation to a verdict.
    ///
    /// Every feed that gets built is closed before this returns, whichever
    /// way the run ends.
    pub(crate) async fn run(mut self, cancel: CancellationToken) -> Result<ExpectationResult> {
        let start = self.factory.start();
        let feed_cancel = cancel.child_token();

        let feeds = self.build_feeds(&feed_cancel).await?;

        let (tx, rx) = mpsc::channel::<Batch>(FEED_CHANNEL_CAPACITY);
        let mut pumps = JoinSet::new();
        for (id, feed) in feeds {
            pumps.spawn(pump(id, feed, tx.clone(), feed_cancel.clone()));
        }
        drop(tx);

        let outcome = self.drive(start, rx, &cancel).await;

        // Single cleanup site for every exit path: stop the pumps and wait
        // for each to close its feed.
        feed_cancel.cancel();
        while pumps.join_next().await.is_some() {}

        outcome
    }

    /// Build all condition feeds concurrently.
    ///
    /// If any build fails, the feeds that did build are closed before the
    /// first failure propagates.
    async fn build_feeds(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<(ConditionId, Box<dyn ConditionFeed>)>> {
        let builds = self.conditions.iter().map(|(id, spec)| {
            let factory = self.factory.clone();
            async move { (id.clone(), spec.build(factory, cancel).await) }
        });

        let mut feeds = Vec::with_capacity(self.conditions.len());
        let mut failure = None;
        for (id, built) in join_all(builds).await {
            match built {
                Ok(feed) => feeds.push((id, feed)),
                Err(e) => {
                    tracing::debug!(condition = %id, error = %e, "condition feed failed to build");
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            for (id, mut feed) in feeds {
                if let Err(close_err) = feed.close().await {
                    tracing::error!(condition = %id, error = %close_err, "failed to close condition feed");
                }
            }
            return Err(e);
        }
        Ok(feeds)
    }

    async fn drive(
        &mut self,
        start: Instant,
        mut rx: Receiver<Batch>,
        cancel: &CancellationToken,
    ) -> Result<ExpectationResult> {
        let mut feeds_open = true;
        loop {
            // The timer future is re-created every iteration, so a stale
            // deadline can never fire against a new one.
            let timer = self.evaluator.next_timer();
            let deadline = match timer {
                Some(t) => start + t,
                None => self.factory.now() + self.inactivity_timeout,
            };

            select! {
                biased;

                _ = cancel.cancelled() => return Err(Error::Cancelled),

                batch = rx.recv(), if feeds_open => match batch {
                    Some(first) => {
                        if let Some(result) = self.evaluate_batches(first, &mut rx) {
                            return Ok(result);
                        }
                    }
                    None => feeds_open = false,
                },

                _ = sleep_until(deadline) => {
                    let result = match timer {
                        None => self.evaluator.timeout(),
                        Some(t) => {
                            // The wake can land exactly on the deadline (a
                            // paused clock always does); evaluate strictly
                            // past it so the same timer never re-arms.
                            let elapsed = self
                                .factory
                                .elapsed()
                                .max(t + Duration::from_nanos(1));
                            self.evaluator.evaluate_elapsed(elapsed)
                        }
                    };
                    if result.is_completed() {
                        return Ok(result);
                    }
                }
            }
        }
    }

    /// Merge everything currently pending across all feeds and evaluate it
    /// in chronological order.
    fn evaluate_batches(
        &mut self,
        first: Batch,
        rx: &mut Receiver<Batch>,
    ) -> Option<ExpectationResult> {
        let mut batches = vec![first];
        while let Ok(more) = rx.try_recv() {
            batches.push(more);
        }

        let mut instances: Vec<FeedInstance> = batches
            .into_iter()
            .flat_map(|(id, batch)| {
                batch
                    .into_iter()
                    .map(move |instance| FeedInstance::new(id.clone(), instance))
            })
            // A zero offset is the "no activity yet" sentinel, never an
            // observed occurrence.
            .filter(|fi| !fi.instance().when().is_zero())
            .collect();
        instances.sort_by_key(|fi| fi.instance().when());

        for fi in &instances {
            let result = self.evaluator.evaluate_instance(fi);
            if result.is_completed() {
                return Some(result);
            }
        }
        None
    }
}

/// Repeatedly awaits one feed and forwards its batches, tagged with the
/// feed's condition, into the merge channel. Exits on cancellation, feed
/// fault, or a closed channel, and always closes its feed on the way out.
async fn pump(
    id: ConditionId,
    mut feed: Box<dyn ConditionFeed>,
    tx: Sender<Batch>,
    cancel: CancellationToken,
) {
    loop {
        let batch = select! {
            biased;
            _ = cancel.cancelled() => break,
            waited = feed.wait_for_instances(&cancel) => match waited {
                Ok(batch) => batch,
                Err(Error::Cancelled) => break,
                Err(e) => {
                    tracing::warn!(condition = %id, error = %e, "condition feed faulted");
                    break;
                }
            },
        };
        if batch.is_empty() {
            continue;
        }
        if tx.send((id.clone(), batch)).await.is_err() {
            break;
        }
    }

    if let Err(e) = feed.close().await {
        tracing::error!(condition = %id, error = %e, "failed to close condition feed");
    }
}
