//! Criterion benchmarks for the chart and leaderboard hot paths.
//!
//! Benchmarks:
//! 1. Percentile bucket for one target day (sort + three nearest-rank picks)
//! 2. Bucketing a symbol's locked predictions across all horizons
//! 3. Leaderboard ranking over resolved accuracies

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stockcast_core::domain::{Analyst, Horizon, NewPrediction, Prediction};
use stockcast_core::store::ResolvedAccuracy;
use stockcast_runner::leaderboard::rank;
use stockcast_runner::percentiles::{bucket, bucket_predictions};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_prices(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(50.0..250.0)).collect()
}

fn make_predictions(rng: &mut StdRng, n: usize) -> Vec<Prediction> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let created_at = base + Duration::hours(rng.gen_range(0..24 * 30));
            let new = NewPrediction {
                user_id: (i % 40) as i64,
                symbol_id: 1,
                current_price: 150.0,
                prices: Horizon::ALL
                    .into_iter()
                    .map(|h| (h, rng.gen_range(100.0..200.0)))
                    .collect(),
            };
            Prediction {
                id: i as i64,
                user_id: new.user_id,
                symbol_id: new.symbol_id,
                current_price: new.current_price,
                created_at,
                is_locked: true,
                locked_at: Some(created_at + Duration::days(1)),
                forecasts: new.forecasts_at(created_at),
            }
        })
        .collect()
}

fn make_accuracies(rng: &mut StdRng, n: usize, analysts: i64) -> Vec<ResolvedAccuracy> {
    (0..n)
        .map(|i| {
            let id = rng.gen_range(0..analysts);
            ResolvedAccuracy {
                prediction_id: i as i64,
                analyst: Analyst {
                    id,
                    name: format!("analyst-{id}"),
                    email: format!("analyst-{id}@example.com"),
                    bio: None,
                },
                accuracy: rng.gen_range(-25.0..25.0),
            }
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("percentile_bucket");
    let mut rng = StdRng::seed_from_u64(7);
    let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();

    for n in [10, 100, 1_000, 10_000] {
        let prices = make_prices(&mut rng, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &prices, |b, prices| {
            b.iter(|| bucket(date, black_box(prices.clone())))
        });
    }
    group.finish();
}

fn bench_bucket_predictions(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_predictions");
    let mut rng = StdRng::seed_from_u64(11);

    for n in [100, 1_000, 5_000] {
        let predictions = make_predictions(&mut rng, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &predictions, |b, p| {
            b.iter(|| bucket_predictions(black_box(p)))
        });
    }
    group.finish();
}

fn bench_leaderboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaderboard_rank");
    let mut rng = StdRng::seed_from_u64(23);

    for n in [1_000, 10_000, 100_000] {
        let rows = make_accuracies(&mut rng, n, 500);
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| rank(black_box(rows), 50))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_bucket,
    bench_bucket_predictions,
    bench_leaderboard
);
criterion_main!(benches);
