//! Predictions and per-horizon forecasts.
//!
//! A prediction holds up to six forecasts, one per [`Horizon`]. Target dates
//! are fixed at creation (`created_at + horizon days`) and never recomputed.
//! Once locked, only the actual-price/accuracy backfill may change.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::horizon::Horizon;

/// One horizon of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub horizon: Horizon,
    pub predicted_price: f64,
    pub target_date: DateTime<Utc>,
    pub actual_price: Option<f64>,
    /// Signed percentage error, `(predicted - actual) / actual * 100`.
    pub accuracy: Option<f64>,
}

impl Forecast {
    /// Target date truncated to the UTC calendar day.
    pub fn target_day(&self) -> NaiveDate {
        self.target_date.date_naive()
    }

    pub fn is_resolved(&self) -> bool {
        self.accuracy.is_some()
    }
}

/// Target date for a horizon: exactly `days * 86_400_000` ms after creation.
pub fn target_date(created_at: DateTime<Utc>, horizon: Horizon) -> DateTime<Utc> {
    created_at + Duration::days(horizon.days())
}

/// Signed percentage error of a forecast against the realised price.
pub fn signed_error(predicted: f64, actual: f64) -> f64 {
    (predicted - actual) / actual * 100.0
}

/// A stored prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: i64,
    pub user_id: i64,
    pub symbol_id: i64,
    pub current_price: f64,
    pub created_at: DateTime<Utc>,
    pub is_locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    /// Present forecasts, ordered by horizon.
    pub forecasts: Vec<Forecast>,
}

impl Prediction {
    pub fn forecast(&self, horizon: Horizon) -> Option<&Forecast> {
        self.forecasts.iter().find(|f| f.horizon == horizon)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionValidationError {
    #[error("current price must be a positive number, got {0}")]
    NonPositiveCurrentPrice(f64),

    #[error("at least one horizon price is required")]
    NoHorizons,

    #[error("{horizon} price must be a positive number, got {price}")]
    NonPositivePrice { horizon: Horizon, price: f64 },
}

/// A prediction as submitted, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
    pub user_id: i64,
    pub symbol_id: i64,
    pub current_price: f64,
    pub prices: BTreeMap<Horizon, f64>,
}

impl NewPrediction {
    pub fn validate(&self) -> Result<(), PredictionValidationError> {
        if !(self.current_price.is_finite() && self.current_price > 0.0) {
            return Err(PredictionValidationError::NonPositiveCurrentPrice(
                self.current_price,
            ));
        }
        if self.prices.is_empty() {
            return Err(PredictionValidationError::NoHorizons);
        }
        for (&horizon, &price) in &self.prices {
            if !(price.is_finite() && price > 0.0) {
                return Err(PredictionValidationError::NonPositivePrice { horizon, price });
            }
        }
        Ok(())
    }

    /// Build the unresolved forecasts for a prediction created at `created_at`.
    pub fn forecasts_at(&self, created_at: DateTime<Utc>) -> Vec<Forecast> {
        self.prices
            .iter()
            .map(|(&horizon, &predicted_price)| Forecast {
                horizon,
                predicted_price,
                target_date: target_date(created_at, horizon),
                actual_price: None,
                accuracy: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_prediction(prices: &[(Horizon, f64)]) -> NewPrediction {
        NewPrediction {
            user_id: 1,
            symbol_id: 1,
            current_price: 150.0,
            prices: prices.iter().copied().collect(),
        }
    }

    #[test]
    fn target_date_is_exact_multiple_of_a_day() {
        let created = Utc.with_ymd_and_hms(2024, 3, 5, 17, 42, 9).unwrap()
            + Duration::milliseconds(123);
        let target = target_date(created, Horizon::D28);
        assert_eq!(
            target.timestamp_millis() - created.timestamp_millis(),
            28 * 86_400_000
        );
    }

    #[test]
    fn forecasts_follow_horizon_order() {
        let p = new_prediction(&[(Horizon::D365, 200.0), (Horizon::D7, 151.0)]);
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let forecasts = p.forecasts_at(created);
        assert_eq!(forecasts.len(), 2);
        assert_eq!(forecasts[0].horizon, Horizon::D7);
        assert_eq!(forecasts[1].horizon, Horizon::D365);
        assert_eq!(
            forecasts[0].target_day(),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
        );
        assert!(forecasts.iter().all(|f| !f.is_resolved()));
    }

    #[test]
    fn validation_requires_a_horizon() {
        assert_eq!(
            new_prediction(&[]).validate(),
            Err(PredictionValidationError::NoHorizons)
        );
    }

    #[test]
    fn validation_rejects_non_positive_prices() {
        let p = new_prediction(&[(Horizon::D7, 0.0)]);
        assert!(matches!(
            p.validate(),
            Err(PredictionValidationError::NonPositivePrice { horizon: Horizon::D7, .. })
        ));

        let mut p = new_prediction(&[(Horizon::D7, 10.0)]);
        p.current_price = f64::NAN;
        assert!(matches!(
            p.validate(),
            Err(PredictionValidationError::NonPositiveCurrentPrice(_))
        ));
    }

    #[test]
    fn signed_error_sign_convention() {
        assert!((signed_error(110.0, 100.0) - 10.0).abs() < 1e-12);
        assert!((signed_error(90.0, 100.0) + 10.0).abs() < 1e-12);
    }
}
