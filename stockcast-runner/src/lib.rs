//! Stockcast Runner: ingestion modes, prediction lifecycle, aggregation.
//!
//! This crate builds on `stockcast-core` to provide:
//! - Batch, chunked, daily and smart ingestion into the price store
//! - Prediction submit / delete / lock sweep / resolution
//! - Nearest-rank percentile charts of locked predictions
//! - Accuracy leaderboards and analyst profiles
//! - TOML configuration with environment overrides
//! - JSON / CSV / Markdown export

pub mod analyst;
pub mod config;
pub mod export;
pub mod ingest;
pub mod leaderboard;
pub mod percentiles;
pub mod predictions;

pub use analyst::{analyst_profile, AnalystProfile};
pub use config::{ConfigError, StockcastConfig};
pub use ingest::{
    drive_chunks, populate_all, populate_next, update_daily, update_smart, ChunkOutcome,
    DailySummary, DriveSummary, Freshness, HistoryRange, IngestError, IngestProgress,
    IngestSummary, LogProgress, PopulateOptions, SmartSummary,
};
pub use leaderboard::{accuracy_leaderboard, Leaderboard, LeaderboardEntry};
pub use percentiles::{build_all_charts, build_chart, PercentileBucket, PredictionChart};
pub use predictions::{lock_sweep, resolve_due, PredictionError, ResolveSummary};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn summaries_are_send_sync() {
        assert_send::<IngestSummary>();
        assert_sync::<IngestSummary>();
        assert_send::<DailySummary>();
        assert_sync::<SmartSummary>();
        assert_send::<ChunkOutcome>();
        assert_sync::<ChunkOutcome>();
    }

    #[test]
    fn view_models_are_send_sync() {
        assert_send::<PredictionChart>();
        assert_sync::<PredictionChart>();
        assert_send::<LeaderboardEntry>();
        assert_sync::<LeaderboardEntry>();
        assert_send::<AnalystProfile>();
        assert_sync::<AnalystProfile>();
    }

    #[test]
    fn config_is_send_sync() {
        assert_send::<StockcastConfig>();
        assert_sync::<StockcastConfig>();
    }
}
