//! Stockcast Core: domain types, trading calendar, market data, persistence.
//!
//! This crate contains everything the pipelines build on:
//! - Domain types (symbols, price bars, horizons, predictions, analysts)
//! - Weekday-only trading calendar
//! - Market-data provider trait, Polygon-compatible HTTP client, rate limiter
//! - Seed universe of tracked equities
//! - SQLite-backed price and prediction stores

pub mod calendar;
pub mod data;
pub mod domain;
pub mod store;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: domain types can cross thread boundaries.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Symbol>();
        require_sync::<domain::Symbol>();
        require_send::<domain::PriceBar>();
        require_sync::<domain::PriceBar>();
        require_send::<domain::Prediction>();
        require_sync::<domain::Prediction>();
        require_send::<domain::Analyst>();
        require_sync::<domain::Analyst>();

        require_send::<data::RateLimiter>();
        require_sync::<data::RateLimiter>();
        require_send::<data::PolygonProvider>();
        require_sync::<data::PolygonProvider>();
        require_send::<store::SqliteStore>();
        require_sync::<store::SqliteStore>();
    }

    /// Architecture contract: providers never see the store.
    ///
    /// `fetch_range` takes a symbol and a date range and returns bars; the
    /// pipelines decide what gets written.
    #[test]
    fn provider_trait_has_no_store_parameter() {
        fn _check_trait_object_builds(
            provider: &dyn data::DataProvider,
            start: chrono::NaiveDate,
            end: chrono::NaiveDate,
        ) -> Result<Vec<domain::PriceBar>, data::DataError> {
            provider.fetch_range("AAPL", start, end)
        }
    }
}
