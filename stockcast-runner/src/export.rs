//! Export: JSON, CSV, and Markdown artifacts for charts and coverage.
//!
//! Chart CSV has one row per historical close and one per percentile
//! bucket, distinguished by the `kind` column:
//! `kind,date,close,p5,p50,p95,count`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stockcast_core::store::{StoreProgress, SymbolCoverage};

use crate::percentiles::PredictionChart;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a chart to pretty JSON.
pub fn export_chart_json(chart: &PredictionChart) -> Result<String> {
    serde_json::to_string_pretty(chart).context("failed to serialize chart to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a chart as CSV; empty cells where a column does not apply.
pub fn export_chart_csv(chart: &PredictionChart) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["kind", "date", "close", "p5", "p50", "p95", "count"])?;

    for point in &chart.historical_prices {
        let record: [&str; 7] = [
            "historical",
            &point.date.to_string(),
            &format!("{:.4}", point.close),
            "",
            "",
            "",
            "",
        ];
        wtr.write_record(record)?;
    }
    for bucket in &chart.future_predictions {
        let record: [&str; 7] = [
            "prediction",
            &bucket.date.to_string(),
            "",
            &format!("{:.4}", bucket.p5),
            &format!("{:.4}", bucket.p50),
            &format!("{:.4}", bucket.p95),
            &bucket.count.to_string(),
        ];
        wtr.write_record(record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write a chart's CSV to `path`.
pub fn write_chart_csv(chart: &PredictionChart, path: &Path) -> Result<()> {
    let csv = export_chart_csv(chart)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

/// Export per-symbol coverage as CSV.
pub fn export_coverage_csv(coverage: &[SymbolCoverage]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["ticker", "name", "status", "rows", "first_date", "last_date"])?;
    for c in coverage {
        let record: [&str; 6] = [
            &c.ticker,
            &c.name,
            c.status.as_str(),
            &c.rows.to_string(),
            &c.first_date.map(|d| d.to_string()).unwrap_or_default(),
            &c.last_date.map(|d| d.to_string()).unwrap_or_default(),
        ];
        wtr.write_record(record)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save `chart.json` and `chart.csv` under `output_dir/{symbol}/`.
///
/// Returns the created directory.
pub fn save_chart_artifacts(chart: &PredictionChart, output_dir: &Path) -> Result<PathBuf> {
    let dir = output_dir.join(&chart.symbol);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;
    std::fs::write(dir.join("chart.json"), export_chart_json(chart)?)?;
    write_chart_csv(chart, &dir.join("chart.csv"))?;
    Ok(dir)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Markdown population report: totals plus a per-symbol table.
pub fn generate_coverage_report(progress: &StoreProgress, coverage: &[SymbolCoverage]) -> String {
    let mut md = String::with_capacity(256 + coverage.len() * 64);

    md.push_str("# Population Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbols | {} |\n", progress.total_symbols));
    md.push_str(&format!("| With data | {} |\n", progress.symbols_with_data));
    md.push_str(&format!("| No data available | {} |\n", progress.symbols_no_data));
    md.push_str(&format!("| Remaining | {} |\n", progress.remaining()));
    md.push_str(&format!("| Price rows | {} |\n", progress.total_prices));
    md.push_str(&format!("| Complete | {}% |\n\n", progress.percent_complete()));

    md.push_str("| Ticker | Status | Rows | First | Last |\n");
    md.push_str("| --- | --- | ---: | --- | --- |\n");
    for c in coverage {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            c.ticker,
            c.status,
            c.rows,
            c.first_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            c.last_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        ));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::percentiles::{HistoricalPoint, PercentileBucket};
    use chrono::NaiveDate;
    use stockcast_core::domain::IngestStatus;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn chart() -> PredictionChart {
        PredictionChart {
            symbol: "AAPL".into(),
            name: "Apple Inc.".into(),
            sector: Some("Technology".into()),
            industry: None,
            historical_prices: vec![HistoricalPoint {
                date: d(2024, 6, 7),
                close: 196.89,
            }],
            future_predictions: vec![PercentileBucket {
                date: d(2024, 6, 14),
                p5: 190.0,
                p50: 200.0,
                p95: 210.0,
                count: 3,
            }],
            prediction_count: 3,
        }
    }

    #[test]
    fn chart_csv_rows() {
        let csv = export_chart_csv(&chart()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "kind,date,close,p5,p50,p95,count");
        assert_eq!(lines[1], "historical,2024-06-07,196.8900,,,,");
        assert_eq!(lines[2], "prediction,2024-06-14,,190.0000,200.0000,210.0000,3");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn artifacts_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = save_chart_artifacts(&chart(), dir.path()).unwrap();
        assert!(out.join("chart.json").exists());
        let json = std::fs::read_to_string(out.join("chart.json")).unwrap();
        let parsed: PredictionChart = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, chart());
    }

    #[test]
    fn coverage_outputs() {
        let coverage = vec![SymbolCoverage {
            ticker: "ZZZ".into(),
            name: "Sleepy, Corp".into(),
            status: IngestStatus::NoDataAvailable,
            rows: 0,
            first_date: None,
            last_date: None,
        }];
        let csv = export_coverage_csv(&coverage).unwrap();
        assert!(csv.contains("ZZZ,\"Sleepy, Corp\",no_data,0,,"));

        let progress = StoreProgress {
            total_symbols: 1,
            symbols_with_data: 0,
            symbols_no_data: 1,
            total_prices: 0,
        };
        let md = generate_coverage_report(&progress, &coverage);
        assert!(md.contains("| Complete | 100% |"));
        assert!(md.contains("| ZZZ | no_data | 0 | - | - |"));
    }
}
