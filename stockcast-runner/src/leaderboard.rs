//! Accuracy leaderboard: analysts ranked by mean absolute percentage error.
//!
//! Only locked predictions with a resolved accuracy for the requested
//! horizon count. Errors are stored signed; ranking uses their absolute
//! value. Lower is better. Ties keep the order in which analysts were
//! first seen.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stockcast_core::domain::{Analyst, Horizon};
use stockcast_core::store::{PredictionStore, ResolvedAccuracy, StoreError};

pub const DEFAULT_LIMIT: usize = 50;

/// One analyst's row in the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub analyst: Analyst,
    /// Mean of |accuracy| over the analyst's resolved forecasts.
    pub average_error: f64,
    pub prediction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub horizon: Horizon,
    pub entries: Vec<LeaderboardEntry>,
}

/// Group resolved accuracies by analyst, average, sort ascending, truncate.
pub fn rank(rows: &[ResolvedAccuracy], limit: usize) -> Vec<LeaderboardEntry> {
    struct Acc<'a> {
        analyst: &'a Analyst,
        total: f64,
        count: usize,
    }

    let mut order: Vec<Acc<'_>> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.analyst.id).or_insert_with(|| {
            order.push(Acc {
                analyst: &row.analyst,
                total: 0.0,
                count: 0,
            });
            order.len() - 1
        });
        order[slot].total += row.accuracy.abs();
        order[slot].count += 1;
    }

    let mut entries: Vec<LeaderboardEntry> = order
        .into_iter()
        .map(|acc| LeaderboardEntry {
            analyst: acc.analyst.clone(),
            average_error: acc.total / acc.count as f64,
            prediction_count: acc.count,
        })
        .collect();

    // Stable: equal averages keep first-seen order.
    entries.sort_by(|a, b| a.average_error.total_cmp(&b.average_error));
    entries.truncate(limit);
    entries
}

/// Build the leaderboard for `horizon` from the prediction store.
pub fn accuracy_leaderboard(
    store: &dyn PredictionStore,
    horizon: Horizon,
    limit: usize,
) -> Result<Leaderboard, StoreError> {
    let rows = store.resolved_for_horizon(horizon)?;
    let entries = rank(&rows, limit);
    tracing::debug!(%horizon, rows = rows.len(), analysts = entries.len(), "built leaderboard");
    Ok(Leaderboard { horizon, entries })
}
