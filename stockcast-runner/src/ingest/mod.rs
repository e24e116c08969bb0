//! Ingestion pipeline: moves provider bars into the price store.
//!
//! Three operating modes share the same building blocks:
//! - [`batch::populate_all`]: every symbol's full history in one run
//! - [`chunked::populate_next`]: one symbol per invocation, resumable
//! - [`daily::update_daily`] / [`daily::update_smart`]: incremental updates
//!
//! Per-symbol failures are collected into summaries and never abort a run.
//! Rate limiting lives in the provider (`Throttled`), not here.

pub mod batch;
pub mod chunked;
pub mod daily;

pub use batch::{populate_all, populate_symbol, PopulateOptions};
pub use chunked::{drive_chunks, populate_next, ChunkOutcome, ChunkReport, DriveSummary};
pub use daily::{update_daily, update_smart, DailySummary, Freshness, SmartSummary};

use chrono::NaiveDate;
use serde::Serialize;
use stockcast_core::calendar;
use stockcast_core::data::DataError;
use stockcast_core::domain::PriceBar;
use stockcast_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Inclusive date range fetched by the populate modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HistoryRange {
    /// `years` back from `today` through yesterday.
    pub fn trailing_years(today: NaiveDate, years: u32) -> Self {
        let (start, end) = calendar::history_window(today, years);
        Self { start, end }
    }
}

/// Result of populating one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Populated {
        rows_inserted: usize,
        latest: Option<PriceBar>,
    },
    /// Provider had no bars; the symbol is tagged and not retried.
    NoData,
    /// Provider had no bars but the symbol already holds stored history.
    /// It is tagged `Populated`, never downgraded.
    NoNewData,
}

/// Progress callbacks for the batch mode.
pub trait IngestProgress {
    /// Called before a symbol is fetched.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called instead of `on_start` for a symbol skipped as already populated.
    fn on_skip(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol is done, whatever the outcome.
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<SymbolOutcome, IngestError>,
    );

    /// Called once the batch finishes.
    fn on_batch_complete(&self, summary: &IngestSummary);
}

/// Progress reporter that logs through `tracing`.
pub struct LogProgress;

impl IngestProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::info!("[{}/{}] fetching {symbol}", index + 1, total);
    }

    fn on_skip(&self, symbol: &str, _index: usize, _total: usize) {
        tracing::debug!(symbol, "already populated");
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<SymbolOutcome, IngestError>,
    ) {
        match result {
            Ok(SymbolOutcome::Populated {
                rows_inserted,
                latest,
            }) => tracing::info!(
                symbol,
                rows_inserted,
                latest_close = latest.as_ref().map(|b| b.close),
                "populated"
            ),
            Ok(SymbolOutcome::NoData) => tracing::warn!(symbol, "no data available, skipped"),
            Ok(SymbolOutcome::NoNewData) => {
                tracing::warn!(symbol, "provider returned no bars, keeping stored history")
            }
            Err(e) => tracing::warn!(symbol, error = %e, "failed"),
        }
    }

    fn on_batch_complete(&self, summary: &IngestSummary) {
        tracing::info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            unchanged = summary.unchanged,
            failed = summary.failed,
            rows_inserted = summary.rows_inserted,
            "population complete: {}/{} symbols",
            summary.succeeded,
            summary.total
        );
    }
}

/// Reporter that does nothing.
pub struct SilentProgress;

impl IngestProgress for SilentProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_skip(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _symbol: &str,
        _index: usize,
        _total: usize,
        _result: &Result<SymbolOutcome, IngestError>,
    ) {
    }

    fn on_batch_complete(&self, _summary: &IngestSummary) {}
}

/// Summary of a batch population run.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Provider returned no data.
    pub skipped: usize,
    /// Skipped because already populated.
    pub already_populated: usize,
    /// Populated symbols the provider returned nothing for on this run.
    pub unchanged: usize,
    pub failed: usize,
    pub rows_inserted: usize,
    pub errors: Vec<(String, IngestError)>,
}

impl IngestSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
