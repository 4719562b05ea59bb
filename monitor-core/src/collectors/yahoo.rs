// collectors/yahoo.rs
// ====
// Yahoo Finance chart API client
// ====
// Daily bars over a short range; the last two closes make a PricePoint.
// ====

use super::utils::validate_ticker;
use super::CollectorError;
use chrono::{DateTime, TimeZone, Utc};
use monitor_common::data::PricePoint;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const CHART_RANGE: &str = "5d";
const CHART_INTERVAL: &str = "1d";

// --- Wire format ---

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// One daily bar with a known close.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Extracts the bars of a chart response, skipping days without a close.
pub fn parse_chart(body: &str) -> Result<Vec<DailyBar>, CollectorError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(err) = envelope.chart.error {
        return Err(CollectorError::ParseError(format!(
            "chart error {}: {}",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        )));
    }

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| CollectorError::ParseError("empty chart result".to_string()))?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = at(&quote.close, i)?;
            Some(DailyBar {
                timestamp: Utc.timestamp_opt(*ts, 0).single()?,
                open: at(&quote.open, i).unwrap_or(close),
                high: at(&quote.high, i).unwrap_or(close),
                low: at(&quote.low, i).unwrap_or(close),
                close,
                volume: at(&quote.volume, i).unwrap_or(0.0),
            })
        })
        .collect();

    Ok(bars)
}

/// Builds a point from the latest bar, with the one before as previous close.
pub fn price_point_from_bars(ticker: &str, bars: &[DailyBar]) -> Result<PricePoint, CollectorError> {
    let [.., previous, last] = bars else {
        return Err(CollectorError::ParseError(format!(
            "{}: need two daily bars, got {}",
            ticker,
            bars.len()
        )));
    };

    let mut point = PricePoint::from_closes(ticker, last.close, previous.close, last.volume, last.timestamp);
    point.open = last.open;
    point.high = last.high;
    point.low = last.low;
    Ok(point)
}

/// Thin client over the chart endpoint.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, ticker: &str) -> Result<Url, CollectorError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| CollectorError::ParseError(format!("bad chart url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| CollectorError::ParseError("chart url cannot be a base".to_string()))?
            .push(ticker);
        url.query_pairs_mut()
            .append_pair("range", CHART_RANGE)
            .append_pair("interval", CHART_INTERVAL);
        Ok(url)
    }

    pub async fn fetch_point(&self, ticker: &str) -> Result<PricePoint, CollectorError> {
        let ticker = validate_ticker(ticker)?;
        let url = self.chart_url(ticker)?;
        debug!("GET {}", url);

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        price_point_from_bars(ticker, &parse_chart(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "^GSPC"},
                "timestamp": [1735603200, 1735689600, 1735776000],
                "indicators": {"quote": [{
                    "open":   [5900.0, 5910.0, null],
                    "high":   [5950.0, 5960.0, null],
                    "low":    [5880.0, 5890.0, null],
                    "close":  [5906.9, 5881.6, null],
                    "volume": [3000000000, 3100000000, null]
                }]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_skips_missing_closes() {
        let bars = parse_chart(CHART).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 5881.6);
        assert_eq!(bars[1].volume, 3_100_000_000.0);
    }

    #[test]
    fn test_price_point_from_last_two_bars() {
        let bars = parse_chart(CHART).unwrap();
        let point = price_point_from_bars("^GSPC", &bars).unwrap();
        assert_eq!(point.symbol, "^GSPC");
        assert_eq!(point.price, 5881.6);
        assert_eq!(point.previous_close, 5906.9);
        assert_eq!(point.open, 5910.0);
        assert!((point.change_pct - (5881.6 / 5906.9 - 1.0) * 100.0).abs() < 1e-9);

        assert!(price_point_from_bars("^GSPC", &bars[..1]).is_err());
    }

    #[test]
    fn test_chart_error_is_reported() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(body).unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_chart_url_layout() {
        let client = YahooClient::new(
            "https://query1.finance.yahoo.com/v8/finance/chart/",
            "test",
            Duration::from_secs(5),
        )
        .unwrap();
        let url = client.chart_url("^GSPC").unwrap();
        assert!(url.path().starts_with("/v8/finance/chart/"));
        assert!(url.path().ends_with("GSPC"));
        assert_eq!(url.query(), Some("range=5d&interval=1d"));
    }
}
