use std::{sync::Mutex, time::Duration};

use tokio::time::Instant;

use crate::Clock;

/// A [`Clock`] that only moves when told to.
///
/// For unit tests that need exact offsets without a runtime's timer
/// machinery, e.g. exercising [`InstanceFactory`](crate::InstanceFactory)
/// stamping.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock().expect("clock lock poisoned") += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("clock lock poisoned")
    }
}
