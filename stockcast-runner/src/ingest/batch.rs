//! Batch mode: populate every symbol's history in one run.

use super::{HistoryRange, IngestError, IngestProgress, IngestSummary, SymbolOutcome};
use stockcast_core::data::DataProvider;
use stockcast_core::domain::{IngestStatus, Symbol};
use stockcast_core::store::{PriceStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateOptions {
    /// Skip symbols already tagged `Populated` (resume an interrupted batch).
    pub skip_populated: bool,
}

/// Fetch and store the full range for one symbol, then tag it.
///
/// Empty provider results tag the symbol `NoDataAvailable`, unless it already
/// has stored bars: `Populated` is never downgraded. Errors leave the tag
/// untouched so the symbol is retried later.
pub fn populate_symbol(
    provider: &dyn DataProvider,
    store: &dyn PriceStore,
    symbol: &Symbol,
    range: HistoryRange,
) -> Result<SymbolOutcome, IngestError> {
    let bars = provider.fetch_range(&symbol.ticker, range.start, range.end)?;

    if bars.is_empty() {
        if store.latest_bar_date(symbol.id)?.is_some() {
            store.set_ingest_status(symbol.id, IngestStatus::Populated)?;
            return Ok(SymbolOutcome::NoNewData);
        }
        store.set_ingest_status(symbol.id, IngestStatus::NoDataAvailable)?;
        return Ok(SymbolOutcome::NoData);
    }

    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        tracing::warn!(symbol = %symbol.ticker, insane, "provider returned inconsistent OHLC bars");
    }

    let rows_inserted = store.insert_bars_skip_duplicates(symbol.id, &bars)?;
    store.set_ingest_status(symbol.id, IngestStatus::Populated)?;

    Ok(SymbolOutcome::Populated {
        rows_inserted,
        latest: bars.last().cloned(),
    })
}

/// Populate every symbol, ordered by ticker.
///
/// Only a failure to list symbols is fatal; every per-symbol error is
/// recorded in the summary and the loop moves on.
pub fn populate_all(
    provider: &dyn DataProvider,
    store: &dyn PriceStore,
    range: HistoryRange,
    options: PopulateOptions,
    progress: &dyn IngestProgress,
) -> Result<IngestSummary, StoreError> {
    let symbols = store.list_symbols()?;
    let total = symbols.len();
    tracing::info!(
        total,
        provider = provider.name(),
        start = %range.start,
        end = %range.end,
        "starting batch population"
    );

    let mut summary = IngestSummary {
        total,
        ..IngestSummary::default()
    };

    for (i, symbol) in symbols.iter().enumerate() {
        if options.skip_populated && symbol.ingest_status == IngestStatus::Populated {
            summary.already_populated += 1;
            progress.on_skip(&symbol.ticker, i, total);
            continue;
        }

        progress.on_start(&symbol.ticker, i, total);
        let result = populate_symbol(provider, store, symbol, range);
        progress.on_complete(&symbol.ticker, i, total, &result);

        match result {
            Ok(SymbolOutcome::Populated { rows_inserted, .. }) => {
                summary.succeeded += 1;
                summary.rows_inserted += rows_inserted;
            }
            Ok(SymbolOutcome::NoData) => summary.skipped += 1,
            Ok(SymbolOutcome::NoNewData) => summary.unchanged += 1,
            Err(e) => {
                summary.failed += 1;
                summary.errors.push((symbol.ticker.clone(), e));
            }
        }
    }

    progress.on_batch_complete(&summary);
    Ok(summary)
}
