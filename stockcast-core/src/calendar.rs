//! Trading calendar: weekdays only, no holiday awareness.
//!
//! Holidays are not modelled here; a provider "not found" for a holiday is
//! handled as a skip by the callers.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};

/// True for Monday through Friday.
pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Most recent trading day on or before `date` (Saturday and Sunday roll back to Friday).
pub fn trading_day_on_or_before(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date - Duration::days(2),
        _ => date,
    }
}

/// Most recent completed trading day as seen from `today`.
///
/// Yesterday, rolled back over the weekend: a Saturday yesterday goes back
/// one more day, a Sunday yesterday goes back two.
pub fn last_trading_day(today: NaiveDate) -> NaiveDate {
    trading_day_on_or_before(today - Duration::days(1))
}

/// Every weekday in `[start, end]`, ascending. Empty when `start > end`.
pub fn weekdays_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_trading_day(*d))
        .collect()
}

/// Historical fetch window: `years` back from `today` through yesterday.
pub fn history_window(today: NaiveDate, years: u32) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_months(Months::new(12 * years))
        .unwrap_or(NaiveDate::MIN);
    (start, today - Duration::days(1))
}
