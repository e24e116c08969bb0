//! Daily-update modes.
//!
//! [`update_daily`] fetches the last trading day for every symbol.
//! [`update_smart`] fills every missing weekday between a symbol's latest
//! stored bar and the last trading day. Both upsert, so re-running is safe.

use super::IngestError;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use stockcast_core::calendar;
use stockcast_core::data::DataProvider;
use stockcast_core::domain::{PriceBar, Symbol};
use stockcast_core::store::{PriceStore, StoreError};

/// Days fetched for a symbol that has no bars at all.
const EMPTY_BACKFILL_DAYS: i64 = 7;

/// Whether a symbol's stored history reaches a target trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Freshness {
    UpToDate,
    /// Weekdays after the latest bar up to the target, oldest first. With no
    /// history at all, the week before the target.
    Stale { missing: Vec<NaiveDate> },
}

impl Freshness {
    pub fn assess(latest: Option<NaiveDate>, target: NaiveDate) -> Self {
        let start = match latest {
            Some(latest) if latest >= target => return Freshness::UpToDate,
            Some(latest) => latest + Duration::days(1),
            None => target - Duration::days(EMPTY_BACKFILL_DAYS),
        };
        let missing = calendar::weekdays_between(start, target);
        if missing.is_empty() {
            Freshness::UpToDate
        } else {
            Freshness::Stale { missing }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub updated: usize,
    /// Provider had no bar for the day (holiday, unknown symbol).
    pub skipped: usize,
    pub errors: usize,
    pub total: usize,
}

/// Upsert the last trading day's bar for every symbol.
pub fn update_daily(
    provider: &dyn DataProvider,
    store: &dyn PriceStore,
    today: NaiveDate,
) -> Result<DailySummary, StoreError> {
    let date = calendar::last_trading_day(today);
    let symbols = store.list_symbols()?;
    tracing::info!(%date, total = symbols.len(), "starting daily update");

    let mut summary = DailySummary {
        date,
        updated: 0,
        skipped: 0,
        errors: 0,
        total: symbols.len(),
    };

    for (i, symbol) in symbols.iter().enumerate() {
        match fetch_and_upsert(provider, store, symbol, date) {
            Ok(Some(bar)) => {
                summary.updated += 1;
                tracing::info!("[{}/{}] {} close {}", i + 1, summary.total, symbol.ticker, bar.close);
            }
            Ok(None) => {
                summary.skipped += 1;
                tracing::debug!(symbol = %symbol.ticker, %date, "no bar for day");
            }
            Err(e) => {
                summary.errors += 1;
                tracing::warn!(symbol = %symbol.ticker, %date, error = %e, "daily update failed");
            }
        }
    }

    tracing::info!(
        updated = summary.updated,
        skipped = summary.skipped,
        errors = summary.errors,
        "daily update complete"
    );
    Ok(summary)
}

fn fetch_and_upsert(
    provider: &dyn DataProvider,
    store: &dyn PriceStore,
    symbol: &Symbol,
    date: NaiveDate,
) -> Result<Option<PriceBar>, IngestError> {
    let Some(bar) = provider.fetch_day(&symbol.ticker, date)? else {
        return Ok(None);
    };
    store.upsert_bar(symbol.id, &bar)?;
    Ok(Some(bar))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmartSummary {
    pub target: NaiveDate,
    /// Symbols that gained at least one row.
    pub symbols_updated: usize,
    pub rows_added: usize,
    pub up_to_date: usize,
    /// Weekdays the provider had no bar for.
    pub days_skipped: usize,
    pub errors: usize,
}

/// Fill every missing weekday up to the last trading day, per symbol.
///
/// A symbol with no bars is backfilled from 7 days before the target.
pub fn update_smart(
    provider: &dyn DataProvider,
    store: &dyn PriceStore,
    today: NaiveDate,
) -> Result<SmartSummary, StoreError> {
    let target = calendar::last_trading_day(today);
    let symbols = store.list_symbols()?;
    tracing::info!(%target, total = symbols.len(), "starting smart update");

    let mut summary = SmartSummary {
        target,
        symbols_updated: 0,
        rows_added: 0,
        up_to_date: 0,
        days_skipped: 0,
        errors: 0,
    };

    for symbol in &symbols {
        let latest = match store.latest_bar_date(symbol.id) {
            Ok(latest) => latest,
            Err(e) => {
                summary.errors += 1;
                tracing::warn!(symbol = %symbol.ticker, error = %e, "could not read latest bar");
                continue;
            }
        };

        let missing = match Freshness::assess(latest, target) {
            Freshness::UpToDate => {
                summary.up_to_date += 1;
                tracing::debug!(symbol = %symbol.ticker, ?latest, "already up to date");
                continue;
            }
            Freshness::Stale { missing } => missing,
        };
        if latest.is_none() {
            tracing::info!(symbol = %symbol.ticker, "no stored bars, backfilling last week");
        }

        let mut added = 0;
        for day in missing {
            match fetch_and_upsert(provider, store, symbol, day) {
                Ok(Some(_)) => added += 1,
                Ok(None) => summary.days_skipped += 1,
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(symbol = %symbol.ticker, %day, error = %e, "backfill failed");
                }
            }
        }

        if added > 0 {
            summary.symbols_updated += 1;
            summary.rows_added += added;
            tracing::info!(symbol = %symbol.ticker, added, "filled missing days");
        }
    }

    tracing::info!(
        rows_added = summary.rows_added,
        up_to_date = summary.up_to_date,
        errors = summary.errors,
        "smart update complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn freshness_up_to_date_at_or_after_target() {
        let target = d(2024, 6, 7);
        assert_eq!(Freshness::assess(Some(target), target), Freshness::UpToDate);
        assert_eq!(
            Freshness::assess(Some(d(2024, 6, 10)), target),
            Freshness::UpToDate
        );
    }

    #[test]
    fn freshness_up_to_date_over_weekend_gap() {
        // Friday bar, Sunday target: no weekday in between.
        assert_eq!(
            Freshness::assess(Some(d(2024, 6, 7)), d(2024, 6, 9)),
            Freshness::UpToDate
        );
    }

    #[test]
    fn freshness_lists_missing_weekdays() {
        // Latest Wednesday 06-05, target Monday 06-10: Thu, Fri, Mon.
        assert_eq!(
            Freshness::assess(Some(d(2024, 6, 5)), d(2024, 6, 10)),
            Freshness::Stale {
                missing: vec![d(2024, 6, 6), d(2024, 6, 7), d(2024, 6, 10)]
            }
        );
        // Empty history: Fri 05-31 .. Fri 06-07 inclusive = 6 weekdays.
        match Freshness::assess(None, d(2024, 6, 7)) {
            Freshness::Stale { missing } => {
                assert_eq!(missing.len(), 6);
                assert_eq!(missing.first(), Some(&d(2024, 5, 31)));
                assert_eq!(missing.last(), Some(&d(2024, 6, 7)));
            }
            other => panic!("expected stale, got {other:?}"),
        }
    }
}
