// monitor-common/src/analysis/anomaly.rs
// ====
// Anomaly detection: price, volume and correlation breaks
// ====

use super::config::ThresholdConfig;
use super::correlation::CorrelationMatrix;
use super::degraded::{Assessment, Degraded};
use super::stats::{mean, zscore_of_last};
use super::store::HistoricalStore;
use crate::data::types::{AssetClass, MarketSnapshot, PricePoint};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    PriceZscore,
    PriceMove,
    VolumeAnomaly,
    CorrelationChange,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::PriceZscore => "price_zscore",
            AnomalyKind::PriceMove => "price_move",
            AnomalyKind::VolumeAnomaly => "volume_anomaly",
            AnomalyKind::CorrelationChange => "correlation_change",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    fn from_level(value: f64, high_above: f64) -> Self {
        if value > high_above {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySubject {
    /// `{asset_class}_{asset}`, e.g. `indices_SPX`.
    Asset(String),
    Pair(String, String),
}

impl fmt::Display for AnomalySubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalySubject::Asset(name) => f.write_str(name),
            AnomalySubject::Pair(a, b) => write!(f, "{a}/{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyDetail {
    Volume { current: f64, average: f64 },
    Correlation { current: f64, baseline: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub subject: AnomalySubject,
    /// Z-score, percent move or correlation change, depending on `kind`.
    pub magnitude: f64,
    pub severity: Severity,
    pub detail: Option<AnomalyDetail>,
}

impl Anomaly {
    pub fn describe(&self) -> String {
        match (&self.kind, &self.detail) {
            (AnomalyKind::PriceZscore, _) => {
                format!("{} price z-score {:.2}", self.subject, self.magnitude)
            }
            (AnomalyKind::PriceMove, _) => {
                format!("{} moved {:+.2}%", self.subject, self.magnitude)
            }
            (AnomalyKind::VolumeAnomaly, Some(AnomalyDetail::Volume { current, average })) => {
                format!(
                    "{} volume {:.0} vs average {:.0} (z {:.2})",
                    self.subject, current, average, self.magnitude
                )
            }
            (AnomalyKind::CorrelationChange, Some(AnomalyDetail::Correlation { current, baseline })) => {
                format!(
                    "{} correlation {:.2} vs baseline {:.2}",
                    self.subject, current, baseline
                )
            }
            _ => format!("{} {} {:.2}", self.subject, self.kind.as_str(), self.magnitude),
        }
    }
}

// =================================================================
// Detector
// =================================================================

pub struct AnomalyDetector<'a> {
    store: &'a HistoricalStore,
    config: &'a ThresholdConfig,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(store: &'a HistoricalStore, config: &'a ThresholdConfig) -> Self {
        Self { store, config }
    }

    pub fn detect(&self, snapshot: &MarketSnapshot, current: &CorrelationMatrix) -> Vec<Anomaly> {
        let mut anomalies = self.price_anomalies(snapshot);
        anomalies.extend(self.volume_anomalies(snapshot));
        anomalies.extend(self.correlation_anomalies(current));
        anomalies
    }

    pub fn price_anomalies(&self, snapshot: &MarketSnapshot) -> Vec<Anomaly> {
        snapshot
            .iter_assets()
            .flat_map(|(class, name, point)| {
                let outcome = self.price_checks(class, name, point);
                isolate("price", name, outcome)
            })
            .collect()
    }

    pub fn volume_anomalies(&self, snapshot: &MarketSnapshot) -> Vec<Anomaly> {
        snapshot
            .iter_assets()
            .flat_map(|(class, name, point)| {
                let outcome = self.volume_check(class, name, point).map(|a| a.into_iter().collect());
                isolate("volume", name, outcome)
            })
            .collect()
    }

    /// Pairs whose correlation moved away from the lagged baseline.
    pub fn correlation_anomalies(&self, current: &CorrelationMatrix) -> Vec<Anomaly> {
        let baseline = CorrelationMatrix::lagged(
            self.store,
            self.config.min_history,
            self.config.correlation_baseline_lag,
        );
        if baseline.is_empty() {
            debug!("No correlation baseline yet");
            return Vec::new();
        }

        let t = &self.config.anomaly;
        current
            .upper_triangle()
            .filter_map(|(a, b, rho)| {
                let base = baseline.get(a, b)?;
                let change = (rho - base).abs();
                (change > t.correlation_change).then(|| Anomaly {
                    kind: AnomalyKind::CorrelationChange,
                    subject: AnomalySubject::Pair(a.to_string(), b.to_string()),
                    magnitude: change,
                    severity: Severity::from_level(change, t.correlation_change_high),
                    detail: Some(AnomalyDetail::Correlation {
                        current: rho,
                        baseline: base,
                    }),
                })
            })
            .collect()
    }

    fn price_checks(
        &self,
        class: AssetClass,
        name: &str,
        point: &PricePoint,
    ) -> Assessment<Vec<Anomaly>> {
        let history = self.store.prices(name);
        Degraded::require(self.config.min_history, history.len())?;

        if !point.price.is_finite() {
            return Err(Degraded::Computation(format!("non-finite price {}", point.price)));
        }

        let t = &self.config.anomaly;
        let subject = AnomalySubject::Asset(format!("{class}_{name}"));
        let mut found = Vec::new();

        if let Some(z) = zscore_of_last(&history, point.price) {
            if z.abs() > t.price_zscore {
                found.push(Anomaly {
                    kind: AnomalyKind::PriceZscore,
                    subject: subject.clone(),
                    magnitude: z,
                    severity: Severity::from_level(z.abs(), t.price_zscore_high),
                    detail: None,
                });
            }
        }

        let change = point.change_pct;
        if change.is_finite() && change.abs() > t.price_move_pct {
            found.push(Anomaly {
                kind: AnomalyKind::PriceMove,
                subject,
                magnitude: change,
                severity: Severity::from_level(change.abs(), t.price_move_high_pct),
                detail: None,
            });
        }

        Ok(found)
    }

    fn volume_check(
        &self,
        class: AssetClass,
        name: &str,
        point: &PricePoint,
    ) -> Assessment<Option<Anomaly>> {
        if point.volume <= 0.0 {
            return Ok(None);
        }

        let history = self.store.volumes(name);
        Degraded::require(self.config.min_history, history.len())?;

        let average = mean(&history).unwrap_or(0.0);
        if average <= 0.0 {
            return Ok(None);
        }

        let t = &self.config.anomaly;
        let anomaly = zscore_of_last(&history, point.volume)
            .filter(|z| z.abs() > t.volume_zscore)
            .map(|z| Anomaly {
                kind: AnomalyKind::VolumeAnomaly,
                subject: AnomalySubject::Asset(format!("{class}_{name}")),
                magnitude: z,
                severity: Severity::from_level(z.abs(), t.volume_zscore_high),
                detail: Some(AnomalyDetail::Volume {
                    current: point.volume,
                    average,
                }),
            });

        Ok(anomaly)
    }
}

/// Per-asset failures are logged and contribute nothing.
fn isolate(check: &str, name: &str, outcome: Assessment<Vec<Anomaly>>) -> Vec<Anomaly> {
    match outcome {
        Ok(found) => found,
        Err(Degraded::InsufficientHistory { needed, available }) => {
            debug!(check, asset = name, needed, available, "Skipping anomaly check");
            Vec::new()
        }
        Err(reason) => {
            warn!(check, asset = name, %reason, "Anomaly check failed");
            Vec::new()
        }
    }
}
