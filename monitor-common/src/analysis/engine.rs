// monitor-common/src/analysis/engine.rs
// ====
// Market Monitor - Analysis engine
// Wires store, classifiers, detectors and aggregators into one pass
// ====

use super::anomaly::{Anomaly, AnomalyDetector, Severity};
use super::config::ThresholdConfig;
use super::correlation::CorrelationMatrix;
use super::indicators::LeadingIndicators;
use super::regime::{MarketRegime, RegimeClassifier, RiskEnvironment, VolatilityRegime};
use super::risk::{RiskMetrics, RiskMetricsAggregator};
use super::store::HistoricalStore;
use super::trend::{TrendClassifier, TrendLabel};
use crate::data::types::MarketSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Result of one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub timestamp: DateTime<Utc>,
    pub regime: MarketRegime,
    /// Keyed by `{asset_class}_{asset}`.
    pub trends: BTreeMap<String, TrendLabel>,
    pub correlations: CorrelationMatrix,
    pub risk_metrics: RiskMetrics,
    pub anomalies: Vec<Anomaly>,
    pub leading_indicators: LeadingIndicators,
}

impl MarketAnalysis {
    pub fn high_severity(&self) -> impl Iterator<Item = &Anomaly> + '_ {
        self.anomalies
            .iter()
            .filter(|a| a.severity == Severity::High)
    }

    /// Worth a mention in the daily update.
    pub fn is_significant(&self) -> bool {
        !self.anomalies.is_empty()
            || self.regime.risk_environment == RiskEnvironment::RiskOff
            || matches!(
                self.regime.volatility_regime,
                VolatilityRegime::Elevated | VolatilityRegime::High
            )
    }

    pub fn confidence(&self) -> f64 {
        self.regime.confidence()
    }
}

pub struct MarketAnalyzer {
    config: ThresholdConfig,
    store: HistoricalStore,
}

impl MarketAnalyzer {
    pub fn new(config: ThresholdConfig) -> Self {
        let store = HistoricalStore::new(config.lookback_days);
        Self { config, store }
    }

    /// Starts from an existing store, e.g. one warmed from the archive.
    pub fn with_store(config: ThresholdConfig, store: HistoricalStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn store(&self) -> &HistoricalStore {
        &self.store
    }

    /// Evaluates the snapshot against prior history, then records it.
    pub fn analyze(&mut self, snapshot: &MarketSnapshot) -> MarketAnalysis {
        let analysis = self.evaluate(snapshot);
        self.update_history(snapshot);

        info!(
            risk = %analysis.regime.risk_environment,
            volatility = %analysis.regime.volatility_regime,
            liquidity = %analysis.regime.liquidity_conditions,
            correlation = %analysis.regime.correlation_regime,
            anomalies = analysis.anomalies.len(),
            "Market analysis complete"
        );
        analysis
    }

    /// Full pass against the current store without mutating it.
    pub fn evaluate(&self, snapshot: &MarketSnapshot) -> MarketAnalysis {
        let correlations = CorrelationMatrix::from_store(&self.store, self.config.min_history);
        debug!(assets = correlations.len(), "Correlation matrix computed");

        let regime =
            RegimeClassifier::new(&self.store, &self.config).classify_with(snapshot, &correlations);
        let anomalies =
            AnomalyDetector::new(&self.store, &self.config).detect(snapshot, &correlations);
        let risk_metrics =
            RiskMetricsAggregator::new(&self.store, &self.config).aggregate(snapshot, &correlations);

        let trend = TrendClassifier::new(&self.store, &self.config);
        let trends = snapshot
            .iter_assets()
            .map(|(class, name, point)| {
                (format!("{class}_{name}"), trend.classify_trend(name, point.price))
            })
            .collect();

        MarketAnalysis {
            timestamp: snapshot.timestamp,
            regime,
            trends,
            correlations,
            risk_metrics,
            anomalies,
            leading_indicators: LeadingIndicators::from_snapshot(snapshot),
        }
    }

    pub fn update_history(&mut self, snapshot: &MarketSnapshot) {
        self.store.update(snapshot);
    }

    pub fn classify(&self, snapshot: &MarketSnapshot) -> MarketRegime {
        RegimeClassifier::new(&self.store, &self.config).classify(snapshot)
    }

    pub fn classify_trend(&self, name: &str, current_price: f64) -> TrendLabel {
        TrendClassifier::new(&self.store, &self.config).classify_trend(name, current_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::anomaly::AnomalyKind;
    use crate::data::types::{AssetClass, PricePoint};
    use chrono::Duration;

    fn snapshot_at(day: i64, spx: f64, vix: f64) -> MarketSnapshot {
        let ts = Utc::now() + Duration::days(day);
        let mut s = MarketSnapshot::new(ts);
        s.insert(
            AssetClass::Indices,
            "SPX",
            PricePoint::from_closes("^GSPC", spx, spx, 0.0, ts),
        );
        s.insert(
            AssetClass::Indices,
            "VIX",
            PricePoint::from_closes("^VIX", vix, vix, 0.0, ts),
        );
        s
    }

    #[test]
    fn test_classify_is_idempotent() {
        let mut analyzer = MarketAnalyzer::new(ThresholdConfig::default());
        for day in 0..30 {
            let wiggle = if day % 2 == 0 { 5.0 } else { -5.0 };
            analyzer.analyze(&snapshot_at(day, 4500.0 + wiggle, 18.0 + wiggle / 5.0));
        }

        let probe = snapshot_at(31, 4510.0, 17.0);
        let first = analyzer.classify(&probe);
        let second = analyzer.classify(&probe);
        assert_eq!(first, second);
        assert_eq!(analyzer.evaluate(&probe), analyzer.evaluate(&probe));
    }

    #[test]
    fn test_analyze_evaluates_before_recording() {
        let mut analyzer = MarketAnalyzer::new(ThresholdConfig::default());
        for day in 0..25 {
            let wiggle = if day % 2 == 0 { 1.0 } else { -1.0 };
            analyzer.analyze(&snapshot_at(day, 4500.0 + wiggle, 18.0));
        }
        assert_eq!(analyzer.store().len("SPX"), 25);

        // A shock far from history must stand out against the prior window.
        let analysis = analyzer.analyze(&snapshot_at(26, 5000.0, 18.0));
        assert!(analysis
            .anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::PriceZscore));
        assert!(analysis.is_significant());
        assert_eq!(analyzer.store().len("SPX"), 26);
    }

    #[test]
    fn test_store_is_bounded() {
        let mut cfg = ThresholdConfig::default();
        cfg.lookback_days = 40;
        let mut analyzer = MarketAnalyzer::new(cfg);
        for day in 0..100 {
            analyzer.analyze(&snapshot_at(day, 4500.0 + day as f64, 18.0));
        }
        assert_eq!(analyzer.store().len("SPX"), 40);
        assert_eq!(analyzer.store().len("VIX"), 40);
    }

    #[test]
    fn test_trends_keyed_by_class() {
        let analyzer = MarketAnalyzer::new(ThresholdConfig::default());
        let analysis = analyzer.evaluate(&snapshot_at(0, 4500.0, 18.0));
        assert_eq!(
            analysis.trends.get("indices_SPX"),
            Some(&TrendLabel::InsufficientData)
        );
        assert_eq!(analysis.risk_metrics.volatility_percentile, 0.5);
        assert!(analysis.anomalies.is_empty());
    }
}
