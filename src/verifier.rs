use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{Error, ExpectationResult, Result, VerificationResult, internal::ExpectationRun};

/// Runs every declared expectation to a verdict.
///
/// Built by [`VerificationBuilder::build`](crate::VerificationBuilder::build).
/// Each expectation is evaluated independently and concurrently, with its
/// own feeds built from the registered condition specifications.
///
/// # Runtime Control
///
/// - [`verify()`](Self::verify) runs to completion with no external
///   cancellation.
/// - [`verify_with_cancellation(token)`](Self::verify_with_cancellation)
///   aborts early when the token fires; feeds are still closed before the
///   cancellation error propagates.
///
/// Both methods take ownership of the verifier, so a finished verification
/// cannot be re-run: there is no use-after-completion state to guard at
/// runtime.
///
/// # Short-circuit
///
/// With [`VerificationBuilder::short_circuit`](crate::VerificationBuilder::short_circuit)
/// enabled, the first expectation to complete as not met cancels the rest.
/// Abandoned expectations report as inconclusive (not completed,
/// [`Outcome::Undetermined`](crate::Outcome::Undetermined)) in their
/// declaration slot.
pub struct Verifier {
    short_circuit: bool,
    runs: Vec<ExpectationRun>,
}

impl Verifier {
    pub(crate) fn new(short_circuit: bool, runs: Vec<ExpectationRun>) -> Self {
        Self {
            short_circuit,
            runs,
        }
    }

    /// Verify every expectation and collect the aggregate result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::External`] when a condition feed fails to build.
    /// Expectations that merely fail to be met are reported in the
    /// [`VerificationResult`], not as errors.
    pub async fn verify(self) -> Result<VerificationResult> {
        self.verify_with_cancellation(CancellationToken::new())
            .await
    }

    /// Verify with an external cancellation token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when `cancel` fires before the verdict;
    /// every feed that was built is closed before the error propagates.
    pub async fn verify_with_cancellation(
        self,
        cancel: CancellationToken,
    ) -> Result<VerificationResult> {
        let total = self.runs.len();
        let run_cancel = cancel.child_token();

        let mut tasks = JoinSet::new();
        for (index, run) in self.runs.into_iter().enumerate() {
            let token = run_cancel.clone();
            tasks.spawn(async move { (index, run.run(token).await) });
        }

        let mut slots: Vec<Option<ExpectationResult>> = (0..total).map(|_| None).collect();
        let mut failure: Option<Error> = None;
        let mut aborted = false;

        // Even after a short-circuit or failure, keep joining so every run
        // finishes its feed cleanup before we return.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(result))) => {
                    let failed = result.is_completed() && !result.outcome().is_met();
                    slots[index] = Some(result);
                    if self.short_circuit && failed && !aborted {
                        tracing::debug!(expectation = index, "short-circuiting verification");
                        aborted = true;
                        run_cancel.cancel();
                    }
                }
                Ok((index, Err(e))) if aborted => {
                    tracing::debug!(expectation = index, error = %e, "evaluation abandoned by short-circuit");
                }
                Ok((index, Err(e))) => {
                    if failure.is_none() {
                        tracing::debug!(expectation = index, error = %e, "evaluation failed, cancelling the rest");
                        failure = Some(e);
                        run_cancel.cancel();
                    }
                }
                Err(join_err) => {
                    if failure.is_none() {
                        failure = Some(Error::internal(join_err));
                        run_cancel.cancel();
                    }
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        let results = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(ExpectationResult::pending))
            .collect();
        Ok(VerificationResult::new(results))
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("expectations", &self.runs.len())
            .field("short_circuit", &self.short_circuit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use crate::{
        Error, Outcome, VerificationBuilder,
        testing::{BrokenCondition, ScriptedCondition},
    };

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[tokio::test(start_paused = true)]
    async fn matching_instance_meets_the_expectation() {
        let mut verify = VerificationBuilder::new();
        let condition = ScriptedCondition::new("web", "request received").instance_at(ms(10), ms(10));
        let probe = condition.probe();
        let request = verify.condition(condition);
        verify
            .expect(|e| e.constraint(|c| c.condition(&request)))
            .unwrap();

        let result = verify.build().unwrap().verify().await.unwrap();

        assert!(result.expectations_met());
        assert_eq!(result.expectations().len(), 1);
        assert_eq!(result.expectations()[0].outcome(), Outcome::Met);
        assert_eq!(probe.feeds_built(), 1);
        assert_eq!(probe.feeds_closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn instances_are_merged_in_chronological_order_across_feeds() {
        let mut verify = VerificationBuilder::new();
        verify.inactivity_timeout(ms(500));

        // Registered (and therefore pumped) first, but stamped later: if the
        // engine evaluated arrival order instead of chronological order, the
        // then-chain below would stall and time out.
        let token = verify.condition(
            ScriptedCondition::new("idp", "token issued").instance_at(ms(10), ms(9)),
        );
        let request = verify.condition(
            ScriptedCondition::new("web", "request received").instance_at(ms(10), ms(8)),
        );

        verify
            .expect(|e| {
                e.constraint(|c| c.condition(&request))
                    .then(|g| g.constraint(|c| c.condition(&token)))
            })
            .unwrap();

        let result = verify.build().unwrap().verify().await.unwrap();

        assert!(result.expectations_met());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_offset_instances_are_never_evaluated() {
        let mut verify = VerificationBuilder::new();
        verify.inactivity_timeout(ms(50));
        let request = verify.condition(
            ScriptedCondition::new("web", "request received").instance_at(ms(5), Duration::ZERO),
        );
        verify
            .expect(|e| e.constraint(|c| c.condition(&request)))
            .unwrap();

        let result = verify.build().unwrap().verify().await.unwrap();

        // The zero-offset sentinel would have met the constraint instantly;
        // instead the run goes inactive.
        assert!(!result.expectations_met());
        assert_eq!(result.expectations()[0].outcome(), Outcome::NotMet);
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_timeout_fails_the_run_after_the_configured_window() {
        let mut verify = VerificationBuilder::new();
        verify.inactivity_timeout(ms(200));
        let request = verify.condition(ScriptedCondition::new("web", "request received"));
        verify
            .expect(|e| e.constraint(|c| c.condition(&request)))
            .unwrap();

        let begin = Instant::now();
        let result = verify.build().unwrap().verify().await.unwrap();
        let took = begin.elapsed();

        assert!(!result.expectations_met());
        assert!(result.expectations()[0].is_completed());
        assert_eq!(result.expectations()[0].outcome(), Outcome::NotMet);
        assert!(took >= ms(200), "run returned after {took:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn constraint_deadline_fires_before_the_inactivity_timeout() {
        let mut verify = VerificationBuilder::new();
        verify.inactivity_timeout(Duration::from_secs(5));
        let request = verify.condition(ScriptedCondition::new("web", "request received"));
        verify
            .expect(|e| e.constraint(|c| c.condition(&request).before(ms(100))))
            .unwrap();

        let begin = Instant::now();
        let result = verify.build().unwrap().verify().await.unwrap();
        let took = begin.elapsed();

        assert!(!result.expectations_met());
        assert_eq!(result.expectations()[0].outcome(), Outcome::NotMet);
        assert!(took >= ms(100), "run returned after {took:?}");
        assert!(took < Duration::from_secs(1), "run waited out the inactivity timeout: {took:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn all_expectations_report_without_short_circuit() {
        let mut verify = VerificationBuilder::new();
        verify.inactivity_timeout(Duration::from_secs(5));
        let condition = ScriptedCondition::new("web", "request received");
        let probe = condition.probe();
        let request = verify.condition(condition);
        verify
            .expect(|e| e.constraint(|c| c.condition(&request).before(ms(10))))
            .unwrap();
        verify
            .expect(|e| e.constraint(|c| c.condition(&request).before(ms(20))))
            .unwrap();

        let result = verify.build().unwrap().verify().await.unwrap();

        assert!(!result.expectations_met());
        assert_eq!(result.expectations().len(), 2);
        assert!(result.expectations().iter().all(|r| r.is_completed()));
        // One feed per expectation, each closed exactly once.
        assert_eq!(probe.feeds_built(), 2);
        assert_eq!(probe.feeds_closed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn short_circuit_abandons_unresolved_expectations() {
        let mut verify = VerificationBuilder::new();
        verify
            .inactivity_timeout(Duration::from_secs(60))
            .short_circuit(true);
        let condition = ScriptedCondition::new("web", "request received");
        let probe = condition.probe();
        let request = verify.condition(condition);
        // Never resolves within the run: no instances, no deadline.
        verify
            .expect(|e| e.constraint(|c| c.condition(&request)))
            .unwrap();
        // Fails fast at its 10ms deadline.
        verify
            .expect(|e| e.constraint(|c| c.condition(&request).before(ms(10))))
            .unwrap();

        let begin = Instant::now();
        let result = verify.build().unwrap().verify().await.unwrap();
        let took = begin.elapsed();

        assert!(!result.expectations_met());
        assert!(took < Duration::from_secs(60), "short-circuit waited for the slow expectation: {took:?}");

        let slow = &result.expectations()[0];
        assert!(!slow.is_completed());
        assert_eq!(slow.outcome(), Outcome::Undetermined);

        let fast = &result.expectations()[1];
        assert!(fast.is_completed());
        assert_eq!(fast.outcome(), Outcome::NotMet);

        assert_eq!(probe.feeds_built(), 2);
        assert_eq!(probe.feeds_closed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_closes_feeds_and_surfaces_as_cancelled() {
        let mut verify = VerificationBuilder::new();
        verify.inactivity_timeout(Duration::from_secs(60));
        let condition = ScriptedCondition::new("web", "request received");
        let probe = condition.probe();
        let request = verify.condition(condition);
        verify
            .expect(|e| e.constraint(|c| c.condition(&request)))
            .unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        let (result, _) = tokio::join!(
            verify.build().unwrap().verify_with_cancellation(token),
            async {
                tokio::time::sleep(ms(50)).await;
                trigger.cancel();
            }
        );

        assert_eq!(result.unwrap_err(), Error::Cancelled);
        assert_eq!(probe.feeds_built(), 1);
        assert_eq!(probe.feeds_closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_feed_build_closes_the_feeds_that_built() {
        let mut verify = VerificationBuilder::new();
        let condition = ScriptedCondition::new("web", "request received");
        let probe = condition.probe();
        let request = verify.condition(condition);
        verify.condition(BrokenCondition::new("idp", "token issued"));
        verify
            .expect(|e| e.constraint(|c| c.condition(&request)))
            .unwrap();

        let err = verify.build().unwrap().verify().await.unwrap_err();

        assert!(matches!(err, Error::External(_)), "unexpected error: {err:?}");
        assert_eq!(probe.feeds_built(), 1);
        assert_eq!(probe.feeds_closed(), 1);
    }
}
