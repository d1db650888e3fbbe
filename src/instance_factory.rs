use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use tokio::time::Instant;

use crate::{Clock, ConditionInstance, Error, Result};

/// Stamps condition occurrences with their offset from the run's zero-point.
///
/// The verifier calls [`start`](Self::start) the moment verification begins;
/// every instance a feed reports is then stamped relative to that moment, so
/// constraints can be expressed as offsets rather than wall-clock times.
///
/// Feeds receive a shared factory when they are built and use
/// [`create`](Self::create) for occurrences observed "now", or
/// [`create_at`](Self::create_at) for occurrences the component batch-reports
/// after the fact with their original timestamp.
pub struct InstanceFactory {
    clock: Arc<dyn Clock>,
    start: RwLock<Option<Instant>>,
}

impl InstanceFactory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            start: RwLock::new(None),
        }
    }

    /// Record the run's zero-point and return it.
    ///
    /// Repeated calls keep the first zero-point.
    pub fn start(&self) -> Instant {
        let mut start = self.start.write().expect("zero-point lock poisoned");
        *start.get_or_insert_with(|| self.clock.now())
    }

    pub(crate) fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Time elapsed since the zero-point, or zero before [`start`](Self::start).
    pub fn elapsed(&self) -> Duration {
        match *self.start.read().expect("zero-point lock poisoned") {
            Some(start) => self.clock.now() - start,
            None => Duration::ZERO,
        }
    }

    /// Create an instance stamped with the current offset.
    ///
    /// Before [`start`](Self::start) the offset is zero, the "no activity
    /// yet" sentinel that the verifier filters out.
    pub fn create(&self, id: &str) -> ConditionInstance {
        ConditionInstance::new(self.elapsed(), id)
    }

    /// Create an instance stamped from a supplied timestamp.
    ///
    /// For feeds that batch-report occurrences that happened earlier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstanceBeforeStart`] when `at` precedes the
    /// zero-point.
    pub fn create_at(&self, id: &str, at: Instant) -> Result<ConditionInstance> {
        let when = match *self.start.read().expect("zero-point lock poisoned") {
            Some(start) => at
                .checked_duration_since(start)
                .ok_or(Error::InstanceBeforeStart)?,
            None => Duration::ZERO,
        };
        Ok(ConditionInstance::new(when, id))
    }
}

impl std::fmt::Debug for InstanceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceFactory")
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;

    #[tokio::test]
    async fn unstarted_factory_stamps_zero() {
        let clock = Arc::new(ManualClock::new());
        let factory = InstanceFactory::new(clock.clone());

        clock.advance(Duration::from_millis(50));
        let instance = factory.create("a");
        assert_eq!(instance.when(), Duration::ZERO);
        assert_eq!(factory.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn instances_are_stamped_relative_to_start() {
        let clock = Arc::new(ManualClock::new());
        let factory = InstanceFactory::new(clock.clone());

        factory.start();
        clock.advance(Duration::from_millis(120));

        let instance = factory.create("a");
        assert_eq!(instance.when(), Duration::from_millis(120));
        assert_eq!(instance.id(), "a");
    }

    #[tokio::test]
    async fn explicit_timestamp_is_stamped_relative_to_start() {
        let clock = Arc::new(ManualClock::new());
        let factory = InstanceFactory::new(clock.clone());

        let start = factory.start();
        clock.advance(Duration::from_millis(500));

        let instance = factory
            .create_at("a", start + Duration::from_millis(75))
            .unwrap();
        assert_eq!(instance.when(), Duration::from_millis(75));
    }

    #[tokio::test]
    async fn timestamp_before_start_is_rejected() {
        let clock = Arc::new(ManualClock::new());
        clock.advance(Duration::from_millis(10));
        let factory = InstanceFactory::new(clock.clone());

        let start = factory.start();
        let result = factory.create_at("a", start - Duration::from_millis(5));
        assert_eq!(result.unwrap_err(), Error::InstanceBeforeStart);
    }

    #[tokio::test]
    async fn start_keeps_the_first_zero_point() {
        let clock = Arc::new(ManualClock::new());
        let factory = InstanceFactory::new(clock.clone());

        let first = factory.start();
        clock.advance(Duration::from_millis(30));
        let second = factory.start();

        assert_eq!(first, second);
        assert_eq!(factory.elapsed(), Duration::from_millis(30));
    }
}
