//! Prediction lifecycle: submit, delete, lock sweep, resolve.
//!
//! Predictions are editable (deletable) only until the lock sweep runs after
//! the UTC day they were created in. Resolution fills in the actual close
//! and signed percentage error once the price store covers a forecast's
//! target trading day.

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use stockcast_core::calendar;
use stockcast_core::domain::prediction::signed_error;
use stockcast_core::domain::{NewPrediction, Prediction, PredictionValidationError};
use stockcast_core::store::{PredictionStore, PriceStore, StoreError};

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("invalid prediction: {0}")]
    Validation(#[from] PredictionValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("prediction {0} belongs to another analyst")]
    Forbidden(i64),

    #[error("prediction {0} is locked")]
    Locked(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validate and store a new prediction created at `now`.
pub fn submit(
    prices: &dyn PriceStore,
    predictions: &dyn PredictionStore,
    prediction: &NewPrediction,
    now: DateTime<Utc>,
) -> Result<Prediction, PredictionError> {
    prediction.validate()?;

    if prices.symbol_by_id(prediction.symbol_id)?.is_none() {
        return Err(PredictionError::NotFound(format!(
            "symbol {}",
            prediction.symbol_id
        )));
    }
    if predictions.get_user(prediction.user_id)?.is_none() {
        return Err(PredictionError::NotFound(format!(
            "analyst {}",
            prediction.user_id
        )));
    }

    let stored = predictions.insert_prediction(prediction, now)?;
    tracing::info!(
        prediction_id = stored.id,
        user_id = stored.user_id,
        symbol_id = stored.symbol_id,
        horizons = stored.forecasts.len(),
        "prediction submitted"
    );
    Ok(stored)
}

/// Fetch a prediction on behalf of `user_id`; other analysts' are forbidden.
pub fn get_owned(
    predictions: &dyn PredictionStore,
    id: i64,
    user_id: i64,
) -> Result<Prediction, PredictionError> {
    let prediction = predictions
        .get_prediction(id)?
        .ok_or_else(|| PredictionError::NotFound(format!("prediction {id}")))?;
    if prediction.user_id != user_id {
        return Err(PredictionError::Forbidden(id));
    }
    Ok(prediction)
}

/// A user's predictions, newest first, optionally narrowed to one symbol.
pub fn list_for_user(
    predictions: &dyn PredictionStore,
    user_id: i64,
    symbol_id: Option<i64>,
) -> Result<Vec<Prediction>, PredictionError> {
    if predictions.get_user(user_id)?.is_none() {
        return Err(PredictionError::NotFound(format!("analyst {user_id}")));
    }
    let mut list = predictions.predictions_for_user(user_id)?;
    if let Some(symbol_id) = symbol_id {
        list.retain(|p| p.symbol_id == symbol_id);
    }
    Ok(list)
}

/// Delete an unlocked prediction owned by `user_id`.
pub fn delete(
    predictions: &dyn PredictionStore,
    id: i64,
    user_id: i64,
) -> Result<(), PredictionError> {
    let prediction = get_owned(predictions, id, user_id)?;
    if prediction.is_locked {
        return Err(PredictionError::Locked(id));
    }
    if !predictions.delete_prediction(id)? {
        return Err(PredictionError::NotFound(format!("prediction {id}")));
    }
    tracing::info!(prediction_id = id, "prediction deleted");
    Ok(())
}

/// Start of the UTC day containing `now`.
pub fn utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Lock every unlocked prediction created before today (UTC).
pub fn lock_sweep(
    predictions: &dyn PredictionStore,
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let cutoff = utc_day_start(now);
    let locked = predictions.lock_created_before(cutoff, now)?;
    tracing::info!(locked, %cutoff, "locked predictions");
    Ok(locked)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    pub due: usize,
    pub resolved: usize,
    /// Waiting for the price store to reach the target trading day.
    pub pending: usize,
    pub errors: usize,
}

/// Record actual prices and signed errors for every due forecast.
///
/// A forecast resolves against the latest close on or before its target
/// date, but only once the store holds data through the target's trading
/// day, so a lagging store never resolves against a stale close.
pub fn resolve_due(
    prices: &dyn PriceStore,
    predictions: &dyn PredictionStore,
    now: DateTime<Utc>,
) -> Result<ResolveSummary, StoreError> {
    let due = predictions.due_unresolved(now)?;
    let mut summary = ResolveSummary {
        due: due.len(),
        ..ResolveSummary::default()
    };
    let mut latest_by_symbol = HashMap::new();

    for forecast in &due {
        let latest = match latest_by_symbol.get(&forecast.symbol_id) {
            Some(latest) => *latest,
            None => {
                let latest = prices.latest_bar_date(forecast.symbol_id)?;
                latest_by_symbol.insert(forecast.symbol_id, latest);
                latest
            }
        };

        let target_day = forecast.target_date.date_naive();
        let trading_day = calendar::trading_day_on_or_before(target_day);
        if latest.map_or(true, |l| l < trading_day) {
            summary.pending += 1;
            continue;
        }

        let Some((close_date, actual)) = prices.close_on_or_before(forecast.symbol_id, target_day)?
        else {
            summary.pending += 1;
            continue;
        };
        if !(actual.is_finite() && actual > 0.0) {
            summary.errors += 1;
            tracing::warn!(
                prediction_id = forecast.prediction_id,
                %close_date,
                actual,
                "unusable close, not resolving"
            );
            continue;
        }

        let accuracy = signed_error(forecast.predicted_price, actual);
        match predictions.record_resolution(forecast.prediction_id, forecast.horizon, actual, accuracy)
        {
            Ok(()) => {
                summary.resolved += 1;
                tracing::debug!(
                    prediction_id = forecast.prediction_id,
                    horizon = %forecast.horizon,
                    %close_date,
                    actual,
                    accuracy,
                    "forecast resolved"
                );
            }
            Err(e) => {
                summary.errors += 1;
                tracing::warn!(prediction_id = forecast.prediction_id, error = %e, "resolution failed");
            }
        }
    }

    tracing::info!(
        due = summary.due,
        resolved = summary.resolved,
        pending = summary.pending,
        "resolution pass complete"
    );
    Ok(summary)
}
