//! Analyst profile: prediction counts and per-horizon mean absolute error.

use serde::Serialize;
use std::collections::BTreeMap;

use stockcast_core::domain::{Analyst, Horizon, Prediction};
use stockcast_core::store::{PredictionStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalystProfile {
    pub analyst: Analyst,
    pub total_predictions: usize,
    pub locked_predictions: usize,
    /// Mean |accuracy| per horizon; `None` when nothing is resolved yet.
    pub mean_absolute_error: BTreeMap<Horizon, Option<f64>>,
    /// Newest first.
    pub predictions: Vec<Prediction>,
}

/// Mean absolute error of the resolved forecasts for `horizon`.
pub fn mean_absolute_error(predictions: &[Prediction], horizon: Horizon) -> Option<f64> {
    let errors: Vec<f64> = predictions
        .iter()
        .filter_map(|p| p.forecast(horizon).and_then(|f| f.accuracy))
        .map(f64::abs)
        .collect();
    if errors.is_empty() {
        return None;
    }
    Some(errors.iter().sum::<f64>() / errors.len() as f64)
}

/// Profile for `user_id`, or `None` if the analyst does not exist.
pub fn analyst_profile(
    store: &dyn PredictionStore,
    user_id: i64,
) -> Result<Option<AnalystProfile>, StoreError> {
    let Some(analyst) = store.get_user(user_id)? else {
        return Ok(None);
    };
    let predictions = store.predictions_for_user(user_id)?;

    let mean_absolute_error = Horizon::ALL
        .into_iter()
        .map(|h| (h, mean_absolute_error(&predictions, h)))
        .collect();

    Ok(Some(AnalystProfile {
        analyst,
        total_predictions: predictions.len(),
        locked_predictions: predictions.iter().filter(|p| p.is_locked).count(),
        mean_absolute_error,
        predictions,
    }))
}
