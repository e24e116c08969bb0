//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over market-data sources so the
//! ingestion modes can run against the HTTP client in production and a
//! scripted provider in tests.

use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

use super::rate_limiter::RateLimiter;
use crate::domain::PriceBar;

/// Structured error types for provider calls.
///
/// "No data" is not an error: range fetches return an empty vector and
/// single-day fetches return `None`.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("HTTP {status} for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

/// Trait for market-data providers.
///
/// Implementations only fetch; they never write to a store.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for `[start, end]`, ascending by date.
    ///
    /// Returns an empty vector when the provider has no data for the range
    /// (delisted symbol, holiday-only range).
    fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError>;

    /// Fetch a single day's bar. `Ok(None)` when the provider reports not-found.
    fn fetch_day(&self, symbol: &str, date: NaiveDate) -> Result<Option<PriceBar>, DataError>;
}

/// Provider decorator that waits for a rate-limiter slot before every call.
///
/// The limiter is shared, so every call through any clone of the `Arc` is
/// spaced by the limiter's interval, whichever symbol it targets.
pub struct Throttled<P> {
    inner: P,
    limiter: Arc<RateLimiter>,
}

impl<P: DataProvider> Throttled<P> {
    pub fn new(inner: P, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: DataProvider> DataProvider for Throttled<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        self.limiter.await_slot();
        self.inner.fetch_range(symbol, start, end)
    }

    fn fetch_day(&self, symbol: &str, date: NaiveDate) -> Result<Option<PriceBar>, DataError> {
        self.limiter.await_slot();
        self.inner.fetch_day(symbol, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rate_limiter::{Clock, ManualClock};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Records the clock instant of every call it receives.
    struct RecordingProvider {
        clock: Arc<ManualClock>,
        calls: Mutex<Vec<Instant>>,
    }

    impl DataProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        fn fetch_range(
            &self,
            _symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PriceBar>, DataError> {
            self.calls.lock().unwrap().push(self.clock.now());
            Ok(Vec::new())
        }

        fn fetch_day(&self, _symbol: &str, _date: NaiveDate) -> Result<Option<PriceBar>, DataError> {
            self.calls.lock().unwrap().push(self.clock.now());
            Ok(None)
        }
    }

    #[test]
    fn throttled_spaces_calls_across_symbols_and_modes() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(RateLimiter::with_clock(
            Duration::from_secs(12),
            clock.clone(),
        ));
        let provider = Throttled::new(
            RecordingProvider {
                clock: clock.clone(),
                calls: Mutex::new(Vec::new()),
            },
            limiter,
        );

        let day = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
        provider.fetch_range("AAPL", day, day).unwrap();
        provider.fetch_day("MSFT", day).unwrap();
        provider.fetch_range("NVDA", day, day).unwrap();

        let calls = provider.inner().calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(12_000));
        }
    }
}
