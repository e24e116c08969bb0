//! Shared fixtures for runner integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use stockcast_core::calendar;
use stockcast_core::data::{Clock, DataError, DataProvider, ManualClock};
use stockcast_core::domain::{PriceBar, SymbolSeed};
use stockcast_core::store::{PriceStore, SqliteStore};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn bar(date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        date,
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000_000,
    }
}

/// One bar per weekday in `[start, end]`, closes rising by 1.0.
pub fn weekday_bars(start: NaiveDate, end: NaiveDate, first_close: f64) -> Vec<PriceBar> {
    calendar::weekdays_between(start, end)
        .into_iter()
        .enumerate()
        .map(|(i, date)| bar(date, first_close + i as f64))
        .collect()
}

/// In-memory store seeded with the given tickers.
pub fn store_with(tickers: &[&str]) -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    let seeds: Vec<SymbolSeed> = tickers
        .iter()
        .map(|t| SymbolSeed::new(t, &format!("{t} Inc."), "Technology", "Software"))
        .collect();
    store.seed_symbols(&seeds).unwrap();
    store
}

/// A provider call as seen by [`ScriptedProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Range(String),
    Day(String, NaiveDate),
}

/// Provider returning scripted responses and recording every call.
///
/// Range requests: bars for known symbols (filtered to the range), an empty
/// result for unknown symbols, an error for symbols in `failing`.
/// Day requests: the bar stored for `(symbol, date)`, `None` otherwise.
#[derive(Default)]
pub struct ScriptedProvider {
    history: HashMap<String, Vec<PriceBar>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    call_times: Mutex<Vec<Instant>>,
    clock: Option<Arc<ManualClock>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_history(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.history.insert(symbol.to_string(), bars);
        self
    }

    pub fn failing(self, symbol: &str) -> Self {
        self.failing.lock().unwrap().insert(symbol.to_string());
        self
    }

    pub fn recover(&self, symbol: &str) {
        self.failing.lock().unwrap().remove(symbol);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), DataError> {
        let symbol = match &call {
            Call::Range(s) | Call::Day(s, _) => s.clone(),
        };
        self.calls.lock().unwrap().push(call);
        if let Some(clock) = &self.clock {
            self.call_times.lock().unwrap().push(clock.now());
        }
        if self.failing.lock().unwrap().contains(&symbol) {
            return Err(DataError::NetworkUnreachable(format!("scripted failure for {symbol}")));
        }
        Ok(())
    }
}

impl DataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        self.record(Call::Range(symbol.to_string()))?;
        Ok(self
            .history
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_day(&self, symbol: &str, date: NaiveDate) -> Result<Option<PriceBar>, DataError> {
        self.record(Call::Day(symbol.to_string(), date))?;
        Ok(self
            .history
            .get(symbol)
            .and_then(|bars| bars.iter().find(|b| b.date == date).cloned()))
    }
}

/// Bars stored for `ticker`.
pub fn stored_bars(store: &SqliteStore, ticker: &str) -> Vec<PriceBar> {
    let symbol = store.find_symbol(ticker).unwrap().unwrap();
    store.bars_for_symbol(symbol.id).unwrap()
}
