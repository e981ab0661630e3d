//! Time source for the background committer.
//!
//! Production code uses [`SystemClock`]; tests drive the committer's schedule
//! and work budget with a [`ManualClock`], whose `sleep` advances logical time
//! instead of blocking.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

/// Abstraction over the time operations the committer needs.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant, used to measure a tick's elapsed work time.
    fn now(&self) -> Instant;

    /// Wait for `duration` before the next tick.
    fn sleep(&self, duration: Duration);

    /// Time elapsed since `earlier`.
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a shared system clock.
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Logical clock that only moves when told to.
///
/// `sleep` advances logical time and yields the thread, so a worker driven by
/// this clock cycles through ticks as fast as the test lets it.
#[derive(Debug)]
pub struct ManualClock {
    /// Logical nanoseconds since creation.
    logical_nanos: AtomicU64,
    /// Real instant at creation, used as the origin for returned instants.
    base: Instant,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock at logical time zero.
    pub fn new() -> Self {
        Self {
            logical_nanos: AtomicU64::new(0),
            base: Instant::now(),
        }
    }

    /// Create a shared manual clock.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Move logical time forward.
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.logical_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Logical time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.logical_nanos.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        thread::yield_now();
    }
}
