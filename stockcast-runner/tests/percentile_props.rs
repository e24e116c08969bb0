//! Property tests for the nearest-rank percentile aggregator.
//!
//! Uses proptest to verify:
//! 1. Ordering: p5 <= p50 <= p95 for every non-empty group
//! 2. Membership: every reported percentile is one of the inputs
//! 3. Count: the bucket counts every input, zeros included

use chrono::NaiveDate;
use proptest::prelude::*;
use stockcast_runner::percentiles::{bucket, nearest_rank};

fn arb_price() -> impl Strategy<Value = f64> {
    prop_oneof![
        1 => Just(0.0),
        9 => (0.01..5_000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0),
    ]
}

fn arb_prices() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 1..200)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

proptest! {
    #[test]
    fn percentiles_are_ordered(prices in arb_prices()) {
        let b = bucket(day(), prices).unwrap();
        prop_assert!(b.p5 <= b.p50);
        prop_assert!(b.p50 <= b.p95);
    }

    #[test]
    fn percentiles_are_members_of_input(prices in arb_prices()) {
        let b = bucket(day(), prices.clone()).unwrap();
        for value in [b.p5, b.p50, b.p95] {
            prop_assert!(prices.contains(&value), "{value} not in input");
        }
    }

    #[test]
    fn count_includes_every_input(prices in arb_prices()) {
        let n = prices.len();
        prop_assert_eq!(bucket(day(), prices).unwrap().count, n);
    }

    #[test]
    fn nearest_rank_index_is_floor(prices in arb_prices(), p in 0.0..1.0_f64) {
        let mut sorted = prices;
        sorted.sort_by(f64::total_cmp);
        let idx = ((p * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
        prop_assert_eq!(nearest_rank(&sorted, p), Some(sorted[idx]));
    }
}

#[test]
fn all_zero_group_reports_zero() {
    let b = bucket(day(), vec![0.0; 4]).unwrap();
    assert_eq!((b.p5, b.p50, b.p95, b.count), (0.0, 0.0, 0.0, 4));
}

#[test]
fn empty_group_has_no_bucket() {
    assert!(bucket(day(), Vec::new()).is_none());
    assert_eq!(nearest_rank(&[], 0.5), None);
}
