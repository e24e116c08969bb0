//! Persistence layer: price/symbol store and prediction store.
//!
//! The ingestion modes and aggregators only see the traits in this module.
//! [`SqliteStore`] implements both on a single SQLite database.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::domain::{
    Analyst, Horizon, IngestStatus, NewAnalyst, NewPrediction, Prediction, PriceBar, Symbol,
    SymbolSeed,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("volume {0} does not fit in a signed 64-bit column")]
    VolumeOverflow(u64),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database path: {0}")]
    Io(#[from] std::io::Error),
}

/// Population progress across the whole universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreProgress {
    pub total_symbols: u64,
    /// Symbols with at least one price row.
    pub symbols_with_data: u64,
    /// Symbols tagged as having no provider data.
    pub symbols_no_data: u64,
    pub total_prices: u64,
}

impl StoreProgress {
    /// Symbols still waiting for a first successful fetch.
    pub fn remaining(&self) -> u64 {
        self.total_symbols
            .saturating_sub(self.symbols_with_data + self.symbols_no_data)
    }

    /// Settled symbols as a whole percentage. An empty universe is 100% done.
    pub fn percent_complete(&self) -> u32 {
        if self.total_symbols == 0 {
            return 100;
        }
        let settled = (self.symbols_with_data + self.symbols_no_data).min(self.total_symbols);
        ((settled as f64 / self.total_symbols as f64) * 100.0).round() as u32
    }
}

/// Per-symbol row count and date span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolCoverage {
    pub ticker: String,
    pub name: String,
    pub status: IngestStatus,
    pub rows: u64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Filter for catalogue search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolQuery {
    /// Case-insensitive substring of ticker or name.
    pub text: Option<String>,
    /// Exact sector match.
    pub sector: Option<String>,
    pub limit: usize,
}

impl Default for SymbolQuery {
    fn default() -> Self {
        Self {
            text: None,
            sector: None,
            limit: 50,
        }
    }
}

/// One resolved forecast with the owning analyst, for the leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAccuracy {
    pub prediction_id: i64,
    pub analyst: Analyst,
    /// Signed percentage error.
    pub accuracy: f64,
}

/// A locked forecast whose target date has passed but has no actual price.
#[derive(Debug, Clone, PartialEq)]
pub struct DueForecast {
    pub prediction_id: i64,
    pub symbol_id: i64,
    pub horizon: Horizon,
    pub predicted_price: f64,
    pub target_date: DateTime<Utc>,
}

/// Symbols and daily price bars.
pub trait PriceStore {
    /// All symbols ordered by ticker.
    fn list_symbols(&self) -> Result<Vec<Symbol>, StoreError>;

    fn find_symbol(&self, ticker: &str) -> Result<Option<Symbol>, StoreError>;

    fn symbol_by_id(&self, id: i64) -> Result<Option<Symbol>, StoreError>;

    /// Insert seeds whose ticker is not yet present. Returns how many were new.
    fn seed_symbols(&self, seeds: &[SymbolSeed]) -> Result<usize, StoreError>;

    fn search_symbols(&self, query: &SymbolQuery) -> Result<Vec<Symbol>, StoreError>;

    /// First symbol by ticker with no price rows and not tagged no-data.
    fn next_unpopulated_symbol(&self) -> Result<Option<Symbol>, StoreError>;

    /// Insert bars, ignoring dates already stored. Returns rows inserted.
    fn insert_bars_skip_duplicates(
        &self,
        symbol_id: i64,
        bars: &[PriceBar],
    ) -> Result<usize, StoreError>;

    /// Insert or overwrite the bar for `(symbol_id, bar.date)`.
    fn upsert_bar(&self, symbol_id: i64, bar: &PriceBar) -> Result<(), StoreError>;

    fn set_ingest_status(&self, symbol_id: i64, status: IngestStatus) -> Result<(), StoreError>;

    fn latest_bar_date(&self, symbol_id: i64) -> Result<Option<NaiveDate>, StoreError>;

    /// All bars for a symbol, ascending by date.
    fn bars_for_symbol(&self, symbol_id: i64) -> Result<Vec<PriceBar>, StoreError>;

    /// Latest `(date, close)` on or before `date`.
    fn close_on_or_before(
        &self,
        symbol_id: i64,
        date: NaiveDate,
    ) -> Result<Option<(NaiveDate, f64)>, StoreError>;

    fn progress(&self) -> Result<StoreProgress, StoreError>;

    /// Coverage for every symbol, ordered by ticker.
    fn coverage(&self) -> Result<Vec<SymbolCoverage>, StoreError>;
}

/// Analysts and their predictions.
pub trait PredictionStore {
    fn insert_user(&self, user: &NewAnalyst) -> Result<Analyst, StoreError>;

    fn get_user(&self, id: i64) -> Result<Option<Analyst>, StoreError>;

    fn insert_prediction(
        &self,
        prediction: &NewPrediction,
        created_at: DateTime<Utc>,
    ) -> Result<Prediction, StoreError>;

    fn get_prediction(&self, id: i64) -> Result<Option<Prediction>, StoreError>;

    /// Returns `false` when no such prediction existed.
    fn delete_prediction(&self, id: i64) -> Result<bool, StoreError>;

    /// Lock every unlocked prediction created strictly before `cutoff`.
    fn lock_created_before(
        &self,
        cutoff: DateTime<Utc>,
        locked_at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    fn locked_predictions_for_symbol(&self, symbol_id: i64) -> Result<Vec<Prediction>, StoreError>;

    /// Locked forecasts for `horizon` with a recorded accuracy, in prediction order.
    fn resolved_for_horizon(&self, horizon: Horizon) -> Result<Vec<ResolvedAccuracy>, StoreError>;

    /// Locked, unresolved forecasts with `target_date <= now`.
    fn due_unresolved(&self, now: DateTime<Utc>) -> Result<Vec<DueForecast>, StoreError>;

    fn record_resolution(
        &self,
        prediction_id: i64,
        horizon: Horizon,
        actual_price: f64,
        accuracy: f64,
    ) -> Result<(), StoreError>;

    /// A user's predictions, newest first.
    fn predictions_for_user(&self, user_id: i64) -> Result<Vec<Prediction>, StoreError>;
}
