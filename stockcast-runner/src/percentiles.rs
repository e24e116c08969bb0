//! Percentile aggregator: consensus bands of locked predictions.
//!
//! For one symbol, every locked forecast contributes its predicted price to
//! the bucket of its target date (UTC calendar day). Each bucket reports the
//! nearest-rank 5th, 50th and 95th percentiles. Charts are recomputed on
//! every call; nothing is cached.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stockcast_core::domain::{PriceBar, Prediction, Symbol};
use stockcast_core::store::{PredictionStore, PriceStore, StoreError};

/// Percentile summary of the predictions targeting one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileBucket {
    pub date: NaiveDate,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Historical closes plus prediction bands for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionChart {
    pub symbol: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub historical_prices: Vec<HistoricalPoint>,
    pub future_predictions: Vec<PercentileBucket>,
    /// Locked predictions for the symbol.
    pub prediction_count: usize,
}

/// Nearest-rank percentile of an ascending, non-empty slice.
///
/// Index is `floor(p * n)` clamped to `[0, n - 1]`. No interpolation.
/// Returns `None` only for an empty slice.
pub fn nearest_rank(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let raw = (p * n as f64).floor();
    let idx = if raw.is_nan() || raw < 0.0 {
        0
    } else {
        (raw as usize).min(n - 1)
    };
    Some(sorted[idx])
}

/// Summarise one group of predicted prices. `None` for an empty group.
pub fn bucket(date: NaiveDate, mut prices: Vec<f64>) -> Option<PercentileBucket> {
    prices.sort_by(f64::total_cmp);
    Some(PercentileBucket {
        date,
        p5: nearest_rank(&prices, 0.05)?,
        p50: nearest_rank(&prices, 0.5)?,
        p95: nearest_rank(&prices, 0.95)?,
        count: prices.len(),
    })
}

/// Group forecasts of locked predictions by target day and summarise,
/// ascending by date. Unlocked predictions are ignored.
pub fn bucket_predictions(predictions: &[Prediction]) -> Vec<PercentileBucket> {
    let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for prediction in predictions.iter().filter(|p| p.is_locked) {
        for forecast in &prediction.forecasts {
            by_date
                .entry(forecast.target_day())
                .or_default()
                .push(forecast.predicted_price);
        }
    }
    by_date
        .into_iter()
        .filter_map(|(date, prices)| bucket(date, prices))
        .collect()
}

/// `(date, close)` series, ascending by date.
pub fn historical_series(bars: &[PriceBar]) -> Vec<HistoricalPoint> {
    let mut points: Vec<HistoricalPoint> = bars
        .iter()
        .map(|b| HistoricalPoint {
            date: b.date,
            close: b.close,
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

/// Chart for a single symbol.
pub fn build_chart(
    prices: &dyn PriceStore,
    predictions: &dyn PredictionStore,
    symbol: &Symbol,
) -> Result<PredictionChart, StoreError> {
    let locked = predictions.locked_predictions_for_symbol(symbol.id)?;
    let bars = prices.bars_for_symbol(symbol.id)?;

    Ok(PredictionChart {
        symbol: symbol.ticker.clone(),
        name: symbol.name.clone(),
        sector: symbol.sector.clone(),
        industry: symbol.industry.clone(),
        historical_prices: historical_series(&bars),
        future_predictions: bucket_predictions(&locked),
        prediction_count: locked.len(),
    })
}

/// Charts for every symbol, ordered by ticker.
pub fn build_all_charts(
    prices: &dyn PriceStore,
    predictions: &dyn PredictionStore,
) -> Result<Vec<PredictionChart>, StoreError> {
    prices
        .list_symbols()?
        .iter()
        .map(|symbol| build_chart(prices, predictions, symbol))
        .collect()
}
