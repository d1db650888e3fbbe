use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Counts feed builds and closes across every feed a
/// [`ScriptedCondition`](crate::testing::ScriptedCondition) produces.
///
/// Cheap to clone; all clones share the same counters. Use it to assert the
/// engine's cleanup guarantee: every feed built is closed exactly once,
/// whichever way the run ends.
#[derive(Debug, Clone, Default)]
pub struct FeedProbe {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    built: AtomicUsize,
    closed: AtomicUsize,
}

impl FeedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of feeds built from the specification so far.
    pub fn feeds_built(&self) -> usize {
        self.counters.built.load(Ordering::SeqCst)
    }

    /// Number of `close` calls observed across those feeds.
    pub fn feeds_closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn record_build(&self) {
        self.counters.built.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_close(&self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
