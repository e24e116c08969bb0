//! Fixed-interval rate limiter for the market-data provider.
//!
//! The provider allows 5 requests per rolling minute, so consecutive calls
//! must be at least 12 seconds apart. The limiter tracks the last dispatch
//! instant and blocks the caller in [`RateLimiter::await_slot`] until the
//! interval has elapsed. One limiter is shared by every provider call in a
//! process, not one per symbol.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Interval that keeps a caller within 5 requests per minute.
pub const FIVE_PER_MINUTE: Duration = Duration::from_secs(12);

/// Source of time for the limiter.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock: `Instant::now` and `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Simulated clock: `sleep` advances time instantly.
///
/// Lets tests and dry runs exercise multi-minute ingestion schedules
/// without waiting, while still observing the exact gaps between calls.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += duration;
    }

    /// Total simulated time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
        self.advance(duration);
    }
}

/// Blocks callers so that dispatches are at least `min_interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Limiter on the system clock.
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
            clock,
        }
    }

    /// Default provider limiter: 12 seconds between calls.
    pub fn five_per_minute() -> Self {
        Self::new(FIVE_PER_MINUTE)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a dispatch is allowed, then claim the slot.
    ///
    /// The first call never waits. Returns how long the caller was held.
    /// The lock is held across the sleep so concurrent callers queue up
    /// behind each other instead of sharing one slot.
    pub fn await_slot(&self) -> Duration {
        let mut last = self
            .last_dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                tracing::debug!(wait_ms = waited.as_millis() as u64, "waiting for rate-limit slot");
                self.clock.sleep(waited);
            }
        }

        *last = Some(self.clock.now());
        waited
    }

    /// Time a caller would wait if it asked for a slot now.
    pub fn time_until_available(&self) -> Duration {
        let last = self
            .last_dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *last {
            None => Duration::ZERO,
            Some(previous) => self
                .min_interval
                .saturating_sub(self.clock.now().saturating_duration_since(previous)),
        }
    }
}
