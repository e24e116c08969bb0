//! Resumable mode: one symbol per invocation.
//!
//! Each call picks the first symbol (by ticker) with no price rows that is
//! not tagged `NoDataAvailable`, so repeated calls walk the universe and
//! eventually report `completed`. An external driver (cron, admin page, or
//! [`drive_chunks`]) calls it until then.

use super::batch::populate_symbol;
use super::{HistoryRange, IngestError, SymbolOutcome};
use chrono::NaiveDate;
use serde::Serialize;
use stockcast_core::data::DataProvider;
use stockcast_core::store::{PriceStore, StoreError, StoreProgress};

/// What a single invocation did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChunkOutcome {
    /// Nothing left to populate.
    Completed { progress: StoreProgress },
    Populated {
        symbol: String,
        name: String,
        rows_inserted: usize,
        latest_close: Option<f64>,
        latest_date: Option<NaiveDate>,
        progress: StoreProgress,
    },
    /// Provider had no data; the symbol is tagged and never picked again.
    NoData {
        symbol: String,
        progress: StoreProgress,
    },
    /// Fetch or write failed; the symbol stays untagged and is retried.
    Failed {
        symbol: String,
        error: String,
        progress: StoreProgress,
    },
}

impl ChunkOutcome {
    pub fn completed(&self) -> bool {
        matches!(self, ChunkOutcome::Completed { .. })
    }

    pub fn progress(&self) -> &StoreProgress {
        match self {
            ChunkOutcome::Completed { progress }
            | ChunkOutcome::Populated { progress, .. }
            | ChunkOutcome::NoData { progress, .. }
            | ChunkOutcome::Failed { progress, .. } => progress,
        }
    }

    /// JSON-ready view carrying the top-level `completed` flag.
    pub fn report(&self) -> ChunkReport<'_> {
        let progress = self.progress();
        ChunkReport {
            completed: self.completed(),
            remaining: progress.remaining(),
            percent_complete: progress.percent_complete(),
            outcome: self,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChunkReport<'a> {
    pub completed: bool,
    pub remaining: u64,
    pub percent_complete: u32,
    #[serde(flatten)]
    pub outcome: &'a ChunkOutcome,
}

/// Populate the next unpopulated symbol.
///
/// Store errors while choosing the symbol or reading progress are returned;
/// errors for the chosen symbol become [`ChunkOutcome::Failed`].
pub fn populate_next(
    provider: &dyn DataProvider,
    store: &dyn PriceStore,
    range: HistoryRange,
) -> Result<ChunkOutcome, StoreError> {
    let Some(symbol) = store.next_unpopulated_symbol()? else {
        let progress = store.progress()?;
        tracing::info!(
            total_symbols = progress.total_symbols,
            total_prices = progress.total_prices,
            "all symbols populated"
        );
        return Ok(ChunkOutcome::Completed { progress });
    };

    tracing::info!(symbol = %symbol.ticker, "processing chunk");
    let result = populate_symbol(provider, store, &symbol, range);
    let progress = store.progress()?;

    Ok(match result {
        Ok(SymbolOutcome::Populated {
            rows_inserted,
            latest,
        }) => {
            tracing::info!(symbol = %symbol.ticker, rows_inserted, "chunk populated");
            ChunkOutcome::Populated {
                symbol: symbol.ticker,
                name: symbol.name,
                rows_inserted,
                latest_close: latest.as_ref().map(|b| b.close),
                latest_date: latest.as_ref().map(|b| b.date),
                progress,
            }
        }
        Ok(SymbolOutcome::NoNewData) => {
            tracing::info!(symbol = %symbol.ticker, "no new bars, stored history kept");
            ChunkOutcome::Populated {
                symbol: symbol.ticker,
                name: symbol.name,
                rows_inserted: 0,
                latest_close: None,
                latest_date: None,
                progress,
            }
        }
        Ok(SymbolOutcome::NoData) => {
            tracing::warn!(symbol = %symbol.ticker, "no data available");
            ChunkOutcome::NoData {
                symbol: symbol.ticker,
                progress,
            }
        }
        Err(e) => {
            tracing::warn!(symbol = %symbol.ticker, error = %e, "chunk failed");
            ChunkOutcome::Failed {
                symbol: symbol.ticker,
                error: e.to_string(),
                progress,
            }
        }
    })
}

/// Totals from a [`drive_chunks`] run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveSummary {
    pub invocations: usize,
    pub populated: usize,
    pub no_data: usize,
    pub failed: usize,
    pub completed: bool,
    pub progress: StoreProgress,
}

/// Call [`populate_next`] until it reports completion or `max_invocations`
/// calls have been made.
pub fn drive_chunks(
    provider: &dyn DataProvider,
    store: &dyn PriceStore,
    range: HistoryRange,
    max_invocations: usize,
) -> Result<DriveSummary, IngestError> {
    let mut summary = DriveSummary {
        invocations: 0,
        populated: 0,
        no_data: 0,
        failed: 0,
        completed: false,
        progress: store.progress()?,
    };

    while summary.invocations < max_invocations {
        let outcome = populate_next(provider, store, range)?;
        summary.invocations += 1;
        summary.progress = *outcome.progress();
        match outcome {
            ChunkOutcome::Completed { .. } => {
                summary.completed = true;
                break;
            }
            ChunkOutcome::Populated { .. } => summary.populated += 1,
            ChunkOutcome::NoData { .. } => summary.no_data += 1,
            ChunkOutcome::Failed { .. } => summary.failed += 1,
        }
    }

    if !summary.completed {
        tracing::info!(
            invocations = summary.invocations,
            remaining = summary.progress.remaining(),
            "stopped at invocation cap"
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_flattens_outcome_with_completed_flag() {
        let progress = StoreProgress {
            total_symbols: 4,
            symbols_with_data: 2,
            symbols_no_data: 1,
            total_prices: 1_000,
        };
        let outcome = ChunkOutcome::NoData {
            symbol: "ZZZ".into(),
            progress,
        };
        let json = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(json["completed"], false);
        assert_eq!(json["outcome"], "no_data");
        assert_eq!(json["symbol"], "ZZZ");
        assert_eq!(json["remaining"], 1);
        assert_eq!(json["percent_complete"], 75);
        assert_eq!(json["progress"]["total_prices"], 1_000);

        let done = ChunkOutcome::Completed { progress };
        assert_eq!(serde_json::to_value(done.report()).unwrap()["completed"], true);
    }
}
