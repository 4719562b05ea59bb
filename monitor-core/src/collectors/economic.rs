// collectors/economic.rs
// ====
// Economic releases from FRED and BLS
// ====
// Every configured series is polled on each cadence; the archive filters
// observations it already holds.
// ====

use super::traits::Collector;
use super::utils::parse_value;
use super::CollectorError;
use crate::config::ReleaseSeries;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use monitor_common::data::{DataSource, EconomicRelease};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One dated observation; `None` when the source reports a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

// --- FRED ---

#[derive(Debug, Deserialize)]
struct FredResponse {
    #[serde(default)]
    observations: Vec<FredObservation>,
}

#[derive(Debug, Deserialize)]
struct FredObservation {
    date: String,
    value: String,
}

/// Parses a FRED observations response, newest first as requested.
pub fn parse_fred_observations(body: &str) -> Result<Vec<Observation>, CollectorError> {
    let response: FredResponse = serde_json::from_str(body)?;
    response
        .observations
        .into_iter()
        .map(|o| {
            let date = NaiveDate::parse_from_str(&o.date, "%Y-%m-%d")
                .map_err(|e| CollectorError::ParseError(format!("FRED date '{}': {}", o.date, e)))?;
            // FRED marks missing observations with "."
            let value = match o.value.trim() {
                "." | "" => None,
                raw => Some(parse_value(raw)?),
            };
            Ok(Observation { date, value })
        })
        .collect()
}

#[derive(Clone)]
pub struct FredClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FredClient {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn latest_observations(
        &self,
        series_id: &str,
        limit: usize,
    ) -> Result<Vec<Observation>, CollectorError> {
        let limit = limit.to_string();
        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_fred_observations(&body)
    }

    /// Most recent non-missing value.
    pub async fn latest_value(&self, series_id: &str) -> Result<Option<f64>, CollectorError> {
        let observations = self.latest_observations(series_id, 5).await?;
        Ok(observations.iter().find_map(|o| o.value))
    }
}

// --- BLS ---

#[derive(Debug, Deserialize)]
struct BlsResponse {
    status: String,
    #[serde(default)]
    message: Vec<String>,
    #[serde(rename = "Results")]
    results: Option<BlsResults>,
}

#[derive(Debug, Deserialize)]
struct BlsResults {
    #[serde(default)]
    series: Vec<BlsSeries>,
}

#[derive(Debug, Deserialize)]
struct BlsSeries {
    #[serde(default)]
    data: Vec<BlsDataPoint>,
}

#[derive(Debug, Deserialize)]
struct BlsDataPoint {
    year: String,
    period: String,
    value: String,
}

/// Parses a BLS timeseries response. Monthly periods only (`M01`..`M12`).
pub fn parse_bls_observations(body: &str) -> Result<Vec<Observation>, CollectorError> {
    let response: BlsResponse = serde_json::from_str(body)?;
    if response.status != "REQUEST_SUCCEEDED" {
        return Err(CollectorError::ParseError(format!(
            "BLS status {}: {}",
            response.status,
            response.message.join("; ")
        )));
    }

    let series = response
        .results
        .and_then(|r| r.series.into_iter().next())
        .ok_or_else(|| CollectorError::ParseError("BLS response without series".to_string()))?;

    let mut observations = Vec::with_capacity(series.data.len());
    for point in series.data {
        let Some(month) = point
            .period
            .strip_prefix('M')
            .and_then(|m| m.parse::<u32>().ok())
            .filter(|m| (1..=12).contains(m))
        else {
            continue;
        };
        let year = point
            .year
            .parse::<i32>()
            .map_err(|e| CollectorError::ParseError(format!("BLS year '{}': {}", point.year, e)))?;
        let date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| CollectorError::ParseError(format!("BLS date {}-{}", year, month)))?;

        let value = match point.value.trim() {
            "-" | "" => None,
            raw => Some(parse_value(raw)?),
        };
        observations.push(Observation { date, value });
    }

    // BLS already returns newest first; keep that order explicit.
    observations.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(observations)
}

#[derive(Clone)]
pub struct BlsClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BlsClient {
    pub fn new(client: Client, base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    pub async fn latest_observations(&self, series_id: &str) -> Result<Vec<Observation>, CollectorError> {
        let year = Utc::now().year();
        let mut payload = json!({
            "seriesid": [series_id],
            "startyear": (year - 1).to_string(),
            "endyear": year.to_string(),
        });
        if let Some(key) = &self.api_key {
            payload["registrationkey"] = json!(key);
        }

        let body = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_bls_observations(&body)
    }
}

/// Builds a release from newest-first observations: value and previous value.
pub fn release_from_observations(
    series: &ReleaseSeries,
    observations: &[Observation],
) -> Option<EconomicRelease> {
    let mut known = observations
        .iter()
        .filter_map(|o| o.value.map(|v| (o.date, v)));
    let (observation_date, value) = known.next()?;
    let previous = known.next().map(|(_, v)| v);

    Some(EconomicRelease {
        indicator: series.indicator.clone(),
        name: series.name.clone(),
        value,
        previous,
        // No consensus feed is wired in.
        expected: None,
        observation_date,
        source: series.source,
        importance: series.importance,
    })
}

// --- Collector ---

pub struct EconomicDataCollector {
    fred: Option<FredClient>,
    bls: BlsClient,
    series: Vec<ReleaseSeries>,
}

impl EconomicDataCollector {
    pub fn new(fred: Option<FredClient>, bls: BlsClient, series: Vec<ReleaseSeries>) -> Self {
        Self { fred, bls, series }
    }

    async fn collect_series(&self, series: &ReleaseSeries) -> Result<Vec<Observation>, CollectorError> {
        match series.source {
            DataSource::Fred => {
                let fred = self.fred.as_ref().ok_or(CollectorError::MissingApiKey("FRED"))?;
                fred.latest_observations(&series.series_id, 2).await
            }
            DataSource::Bls => self.bls.latest_observations(&series.series_id).await,
        }
    }
}

#[async_trait]
impl Collector for EconomicDataCollector {
    type Output = Vec<EconomicRelease>;

    fn name(&self) -> &str {
        "economic"
    }

    async fn collect(&self) -> Result<Self::Output, CollectorError> {
        let mut releases = Vec::new();
        let mut failures = 0;

        for series in &self.series {
            match self.collect_series(series).await {
                Ok(observations) => match release_from_observations(series, &observations) {
                    Some(release) => {
                        debug!(
                            "{} ({}) {} = {}",
                            series.indicator,
                            series.source.as_str(),
                            release.observation_date,
                            release.value
                        );
                        releases.push(release);
                    }
                    None => warn!("{}: no usable observation", series.indicator),
                },
                Err(e) => {
                    failures += 1;
                    warn!("Error collecting {}: {}", series.indicator, e);
                }
            }
        }

        if failures > 0 && failures == self.series.len() {
            return Err(CollectorError::NetworkError(format!(
                "all {} economic series failed",
                failures
            )));
        }

        info!("Collected {} economic releases", releases.len());
        Ok(releases)
    }

    fn validate(&self, data: &Self::Output) -> bool {
        data.iter().all(|r| r.value.is_finite() && !r.indicator.is_empty())
    }
}

/// Shared HTTP client for the JSON APIs.
pub fn http_client(user_agent: &str, timeout: Duration) -> Result<Client, CollectorError> {
    Ok(Client::builder().timeout(timeout).user_agent(user_agent).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_common::data::Importance;

    fn unrate() -> ReleaseSeries {
        ReleaseSeries {
            indicator: "UNRATE".into(),
            name: "Unemployment Rate".into(),
            source: DataSource::Fred,
            series_id: "UNRATE".into(),
            importance: Importance::High,
        }
    }

    #[test]
    fn test_parse_fred_with_missing_marker() {
        let body = r#"{"realtime_start":"2025-01-10","observations":[
            {"realtime_start":"2025-01-10","realtime_end":"2025-01-10","date":"2024-12-01","value":"."},
            {"realtime_start":"2025-01-10","realtime_end":"2025-01-10","date":"2024-11-01","value":"4.2"},
            {"realtime_start":"2025-01-10","realtime_end":"2025-01-10","date":"2024-10-01","value":"4.1"}
        ]}"#;
        let observations = parse_fred_observations(body).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].value, None);

        let release = release_from_observations(&unrate(), &observations).unwrap();
        assert_eq!(release.value, 4.2);
        assert_eq!(release.previous, Some(4.1));
        assert_eq!(release.observation_date, NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
        assert_eq!(release.expected, None);
    }

    #[test]
    fn test_parse_bls_monthly() {
        let body = r#"{"status":"REQUEST_SUCCEEDED","responseTime":120,"message":[],
            "Results":{"series":[{"seriesID":"CES0000000001","data":[
                {"year":"2024","period":"M13","periodName":"Annual","value":"158,000"},
                {"year":"2024","period":"M12","periodName":"December","latest":"true","value":"159,486"},
                {"year":"2024","period":"M11","periodName":"November","value":"159,230"}
            ]}]}}"#;
        let observations = parse_bls_observations(body).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].date, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(observations[0].value, Some(159_486.0));
    }

    #[test]
    fn test_bls_failure_status() {
        let body = r#"{"status":"REQUEST_NOT_PROCESSED","message":["daily threshold reached"],"Results":{}}"#;
        let err = parse_bls_observations(body).unwrap_err();
        assert!(err.to_string().contains("daily threshold"));
    }

    #[test]
    fn test_release_needs_a_value() {
        let observations = vec![Observation {
            date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            value: None,
        }];
        assert!(release_from_observations(&unrate(), &observations).is_none());
    }

    #[tokio::test]
    async fn test_fred_series_without_key_fails() {
        let client = http_client("test", Duration::from_secs(1)).unwrap();
        let collector = EconomicDataCollector::new(
            None,
            BlsClient::new(client, "http://127.0.0.1:9/", None),
            vec![unrate()],
        );
        let err = collector.collect().await.unwrap_err();
        assert!(err.to_string().contains("all 1 economic series failed"));
    }
}
