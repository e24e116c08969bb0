//! Polygon-compatible market-data provider.
//!
//! Two endpoints are used: the daily aggregates range endpoint for history
//! and the open-close endpoint for a single trading day. Responses carry a
//! `status` string; only `"OK"` counts as data. Any other non-error status
//! (including a 404 with `NOT_FOUND`) means the provider has nothing for the
//! request, which callers treat as a skip.

use super::provider::{DataError, DataProvider};
use crate::domain::PriceBar;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// `/v2/aggs/ticker/.../range/...` response.
#[derive(Debug, Deserialize)]
struct AggregatesResponse {
    status: String,
    #[serde(default)]
    results: Option<Vec<AggregateBar>>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AggregateBar {
    /// Epoch milliseconds of the bar's session start.
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: serde_json::Number,
}

/// `/v1/open-close/...` response. Price fields are absent on `NOT_FOUND`.
#[derive(Debug, Deserialize)]
struct OpenCloseResponse {
    status: String,
    #[serde(default)]
    from: Option<String>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<serde_json::Number>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Blocking HTTP client for a Polygon-compatible API.
pub struct PolygonProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl PolygonProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DataError::Configuration("API key is empty".into()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn range_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/v2/aggs/ticker/{symbol}/range/1/day/{}/{}?adjusted=true&sort=asc&apiKey={}",
            self.base_url,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            self.api_key
        )
    }

    fn day_url(&self, symbol: &str, date: NaiveDate) -> String {
        format!(
            "{}/v1/open-close/{symbol}/{}?adjusted=true&apiKey={}",
            self.base_url,
            date.format("%Y-%m-%d"),
            self.api_key
        )
    }

    /// GET `url` and return the body, mapping transport and HTTP failures.
    ///
    /// Returns `Ok(None)` for a 404, which the provider uses for unknown
    /// tickers and non-trading days.
    fn get(&self, symbol: &str, url: &str) -> Result<Option<String>, DataError> {
        tracing::debug!(symbol, provider = "polygon", "GET {}", redact(url));

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DataError::AuthenticationRequired(format!(
                "HTTP {status} for {symbol}"
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        if !status.is_success() {
            // Error bodies are usually JSON with a message; surface it if so.
            return Err(match provider_error_message(&body) {
                Some(message) => DataError::Provider(message),
                None => DataError::Http {
                    status: status.as_u16(),
                    symbol: symbol.to_string(),
                },
            });
        }
        Ok(Some(body))
    }
}

impl DataProvider for PolygonProvider {
    fn name(&self) -> &str {
        "polygon"
    }

    fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        let url = self.range_url(symbol, start, end);
        match self.get(symbol, &url)? {
            Some(body) => parse_aggregates(symbol, &body),
            None => Ok(Vec::new()),
        }
    }

    fn fetch_day(&self, symbol: &str, date: NaiveDate) -> Result<Option<PriceBar>, DataError> {
        let url = self.day_url(symbol, date);
        match self.get(symbol, &url)? {
            Some(body) => parse_open_close(symbol, date, &body),
            None => Ok(None),
        }
    }
}

/// Parse an aggregates body into bars, ascending by date.
fn parse_aggregates(symbol: &str, body: &str) -> Result<Vec<PriceBar>, DataError> {
    let resp: AggregatesResponse = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormat(format!("failed to parse aggregates for {symbol}: {e}"))
    })?;

    match resp.status.as_str() {
        "OK" => {}
        "ERROR" => {
            return Err(DataError::Provider(
                resp.error
                    .or(resp.message)
                    .unwrap_or_else(|| format!("error status for {symbol}")),
            ))
        }
        other => {
            tracing::debug!(symbol, status = other, "no aggregates");
            return Ok(Vec::new());
        }
    }

    let mut bars = resp
        .results
        .unwrap_or_default()
        .into_iter()
        .map(|agg| {
            let date = chrono::DateTime::from_timestamp_millis(agg.t)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| DataError::ResponseFormat(format!("invalid timestamp: {}", agg.t)))?;
            Ok(PriceBar {
                date,
                open: agg.o,
                high: agg.h,
                low: agg.l,
                close: agg.c,
                volume: volume_from_json(&agg.v)?,
            })
        })
        .collect::<Result<Vec<_>, DataError>>()?;

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

/// Parse an open-close body. `Ok(None)` unless the status is `OK`.
fn parse_open_close(
    symbol: &str,
    requested: NaiveDate,
    body: &str,
) -> Result<Option<PriceBar>, DataError> {
    let resp: OpenCloseResponse = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormat(format!("failed to parse open-close for {symbol}: {e}"))
    })?;

    match resp.status.as_str() {
        "OK" => {}
        "ERROR" => {
            return Err(DataError::Provider(
                resp.error
                    .or(resp.message)
                    .unwrap_or_else(|| format!("error status for {symbol}")),
            ))
        }
        _ => return Ok(None),
    }

    let missing = |field: &str| DataError::ResponseFormat(format!("open-close for {symbol} missing {field}"));
    let date = match resp.from.as_deref() {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| DataError::ResponseFormat(format!("invalid date {s:?}: {e}")))?,
        None => requested,
    };

    Ok(Some(PriceBar {
        date,
        open: resp.open.ok_or_else(|| missing("open"))?,
        high: resp.high.ok_or_else(|| missing("high"))?,
        low: resp.low.ok_or_else(|| missing("low"))?,
        close: resp.close.ok_or_else(|| missing("close"))?,
        volume: volume_from_json(resp.volume.as_ref().ok_or_else(|| missing("volume"))?)?,
    }))
}

/// Provider volumes can arrive as floats; round to the nearest share.
fn volume_from_json(v: &serde_json::Number) -> Result<u64, DataError> {
    if let Some(n) = v.as_u64() {
        return Ok(n);
    }
    match v.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f <= u64::MAX as f64 => Ok(f.round() as u64),
        _ => Err(DataError::ResponseFormat(format!("invalid volume: {v}"))),
    }
}

fn provider_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        status: Option<String>,
        error: Option<String>,
        message: Option<String>,
    }
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    if parsed.status.as_deref() != Some("ERROR") {
        return None;
    }
    parsed.error.or(parsed.message)
}

/// Strip the API key from a URL before logging it.
fn redact(url: &str) -> &str {
    url.split_once("apiKey=").map_or(url, |(head, _)| head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn urls_match_provider_contract() {
        let p = PolygonProvider::new("KEY", "https://api.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            p.range_url("AAPL", d(2023, 1, 3), d(2024, 12, 31)),
            "https://api.example.com/v2/aggs/ticker/AAPL/range/1/day/2023-01-03/2024-12-31?adjusted=true&sort=asc&apiKey=KEY"
        );
        assert_eq!(
            p.day_url("MSFT", d(2024, 6, 7)),
            "https://api.example.com/v1/open-close/MSFT/2024-06-07?adjusted=true&apiKey=KEY"
        );
    }

    #[test]
    fn empty_api_key_rejected() {
        let err = PolygonProvider::new("  ", DEFAULT_BASE_URL, Duration::from_secs(5));
        assert!(matches!(err, Err(DataError::Configuration(_))));
    }

    #[test]
    fn aggregates_parse_and_sort() {
        // 2024-06-07 and 2024-06-06 at 04:00 UTC, out of order.
        let body = r#"{
            "status": "OK",
            "resultsCount": 2,
            "results": [
                {"t": 1717732800000, "o": 10.0, "h": 12.0, "l": 9.5, "c": 11.0, "v": 1500.6},
                {"t": 1717646400000, "o": 9.0, "h": 10.5, "l": 8.5, "c": 10.0, "v": 1200}
            ]
        }"#;
        let bars = parse_aggregates("AAPL", body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, d(2024, 6, 6));
        assert_eq!(bars[1].date, d(2024, 6, 7));
        assert_eq!(bars[0].volume, 1200);
        assert_eq!(bars[1].volume, 1501);
        assert_eq!(bars[1].close, 11.0);
    }

    #[test]
    fn aggregates_without_results_is_empty() {
        let body = r#"{"status": "OK", "resultsCount": 0}"#;
        assert!(parse_aggregates("XYZ", body).unwrap().is_empty());
    }

    #[test]
    fn aggregates_delayed_status_is_empty() {
        let body = r#"{"status": "DELAYED", "results": [{"t": 1717732800000, "o": 1, "h": 1, "l": 1, "c": 1, "v": 1}]}"#;
        assert!(parse_aggregates("XYZ", body).unwrap().is_empty());
    }

    #[test]
    fn aggregates_error_status_is_provider_error() {
        let body = r#"{"status": "ERROR", "error": "Unknown API Key"}"#;
        match parse_aggregates("XYZ", body) {
            Err(DataError::Provider(msg)) => assert_eq!(msg, "Unknown API Key"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_format_error() {
        assert!(matches!(
            parse_aggregates("XYZ", "<html>oops</html>"),
            Err(DataError::ResponseFormat(_))
        ));
        assert!(matches!(
            parse_open_close("XYZ", d(2024, 6, 7), "{"),
            Err(DataError::ResponseFormat(_))
        ));
    }

    #[test]
    fn open_close_ok() {
        let body = r#"{
            "status": "OK", "from": "2024-06-07", "symbol": "AAPL",
            "open": 194.65, "high": 196.94, "low": 194.14, "close": 196.89,
            "volume": 53103912, "afterHours": 197.0, "preMarket": 194.5
        }"#;
        let bar = parse_open_close("AAPL", d(2024, 6, 7), body).unwrap().unwrap();
        assert_eq!(bar.date, d(2024, 6, 7));
        assert_eq!(bar.close, 196.89);
        assert_eq!(bar.volume, 53_103_912);
    }

    #[test]
    fn open_close_not_found_is_none() {
        let body = r#"{"status": "NOT_FOUND", "request_id": "abc", "message": "Data not found."}"#;
        assert!(parse_open_close("AAPL", d(2024, 7, 4), body).unwrap().is_none());
    }

    #[test]
    fn open_close_ok_missing_field_is_format_error() {
        let body = r#"{"status": "OK", "from": "2024-06-07", "open": 1.0, "high": 1.0, "low": 1.0, "volume": 1}"#;
        assert!(matches!(
            parse_open_close("AAPL", d(2024, 6, 7), body),
            Err(DataError::ResponseFormat(_))
        ));
    }

    #[test]
    fn negative_volume_rejected() {
        let v: serde_json::Number = serde_json::from_str("-5").unwrap();
        assert!(volume_from_json(&v).is_err());
    }

    #[test]
    fn error_body_message_extracted() {
        assert_eq!(
            provider_error_message(r#"{"status":"ERROR","error":"bad ticker"}"#).as_deref(),
            Some("bad ticker")
        );
        assert_eq!(provider_error_message(r#"{"status":"OK"}"#), None);
        assert_eq!(provider_error_message("Bad Gateway"), None);
    }

    #[test]
    fn api_key_redacted_in_logs() {
        assert_eq!(
            redact("https://x/v1/open-close/A/2024-01-02?adjusted=true&apiKey=SECRET"),
            "https://x/v1/open-close/A/2024-01-02?adjusted=true&"
        );
    }
}
