// monitor-common/src/analysis/risk.rs
// Portfolio-level risk metrics over the stored history.

use super::config::ThresholdConfig;
use super::correlation::CorrelationMatrix;
use super::indicators::put_call_ratio;
use super::stats::{
    annualized_volatility, diffs, percentile, percentile_of_score, population_std,
    simple_returns, TRADING_DAYS,
};
use super::store::HistoricalStore;
use crate::data::types::{AssetClass, MarketSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Mean absolute pairwise correlation.
    pub cross_asset_correlation: f64,
    /// Percentile of the current VIX within its history, in `[0, 1]`.
    pub volatility_percentile: f64,
    /// Spread of annualized volatilities across assets.
    pub risk_dispersion: f64,
    /// 5th percentile of pooled daily returns.
    pub tail_risk: f64,
    pub equity_put_call: Option<f64>,
    pub rate_volatility: Option<f64>,
    pub currency_volatility: Option<f64>,
}

impl Default for RiskMetrics {
    fn default() -> Self {
        Self {
            cross_asset_correlation: 0.0,
            volatility_percentile: 0.5,
            risk_dispersion: 0.0,
            tail_risk: 0.0,
            equity_put_call: None,
            rate_volatility: None,
            currency_volatility: None,
        }
    }
}

pub struct RiskMetricsAggregator<'a> {
    store: &'a HistoricalStore,
    config: &'a ThresholdConfig,
}

impl<'a> RiskMetricsAggregator<'a> {
    pub fn new(store: &'a HistoricalStore, config: &'a ThresholdConfig) -> Self {
        Self { store, config }
    }

    pub fn aggregate(&self, snapshot: &MarketSnapshot, correlations: &CorrelationMatrix) -> RiskMetrics {
        let has_indices = snapshot.has_class(AssetClass::Indices);

        RiskMetrics {
            cross_asset_correlation: correlations.average_pairwise(),
            volatility_percentile: self.volatility_percentile(snapshot),
            risk_dispersion: self.risk_dispersion(snapshot),
            tail_risk: self.tail_risk(snapshot),
            equity_put_call: has_indices.then(|| put_call_ratio(snapshot)).flatten(),
            rate_volatility: self.rate_volatility(snapshot),
            currency_volatility: self.currency_volatility(snapshot),
        }
    }

    pub fn volatility_percentile(&self, snapshot: &MarketSnapshot) -> f64 {
        let Some(vix) = snapshot.get(AssetClass::Indices, "VIX") else {
            return 0.5;
        };
        percentile_of_score(&self.store.prices("VIX"), vix.price)
            .map(|p| p / 100.0)
            .filter(|p| p.is_finite())
            .unwrap_or(0.5)
    }

    pub fn risk_dispersion(&self, snapshot: &MarketSnapshot) -> f64 {
        let vols: Vec<f64> = self
            .eligible_returns(snapshot)
            .filter_map(|returns| annualized_volatility(&returns))
            .collect();
        population_std(&vols).unwrap_or(0.0)
    }

    pub fn tail_risk(&self, snapshot: &MarketSnapshot) -> f64 {
        let pooled: Vec<f64> = self
            .eligible_returns(snapshot)
            .flatten()
            .filter(|r| r.is_finite())
            .collect();
        percentile(&pooled, 5.0).unwrap_or(0.0)
    }

    /// Annualized volatility of daily 10y yield changes.
    pub fn rate_volatility(&self, snapshot: &MarketSnapshot) -> Option<f64> {
        snapshot.bonds.as_ref()?;
        let yields = self.store.prices("US10Y");
        if yields.len() < self.config.min_history {
            return None;
        }
        population_std(&diffs(&yields)).map(|s| s * TRADING_DAYS.sqrt())
    }

    pub fn currency_volatility(&self, snapshot: &MarketSnapshot) -> Option<f64> {
        if !snapshot.has_class(AssetClass::Fx) {
            return None;
        }
        let dxy = self.store.prices("DXY");
        if dxy.len() < self.config.min_history {
            return None;
        }
        annualized_volatility(&simple_returns(&dxy))
    }

    /// Daily returns of every snapshot asset with enough history.
    fn eligible_returns<'s>(
        &'s self,
        snapshot: &'s MarketSnapshot,
    ) -> impl Iterator<Item = Vec<f64>> + 's {
        snapshot.iter_assets().filter_map(move |(_, name, _)| {
            let prices = self.store.prices(name);
            (prices.len() >= self.config.min_history).then(|| simple_returns(&prices))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{BondSnapshot, OptionsActivity, PricePoint};
    use chrono::Utc;

    fn point(price: f64) -> PricePoint {
        PricePoint::from_closes("X", price, price, 0.0, Utc::now())
    }

    #[test]
    fn test_defaults_without_history() {
        let cfg = ThresholdConfig::default();
        let store = HistoricalStore::new(252);
        let mut snapshot = MarketSnapshot::new(Utc::now());
        snapshot.insert(AssetClass::Indices, "VIX", point(20.0));

        let metrics =
            RiskMetricsAggregator::new(&store, &cfg).aggregate(&snapshot, &CorrelationMatrix::empty());
        assert_eq!(metrics.volatility_percentile, 0.5);
        assert_eq!(metrics.risk_dispersion, 0.0);
        assert_eq!(metrics.tail_risk, 0.0);
        assert_eq!(metrics.cross_asset_correlation, 0.0);
        assert_eq!(metrics.rate_volatility, None);
        assert_eq!(metrics.currency_volatility, None);
    }

    #[test]
    fn test_vix_percentile() {
        let cfg = ThresholdConfig::default();
        let mut store = HistoricalStore::new(252);
        for v in [10.0, 20.0, 30.0, 40.0] {
            store.record("VIX", v, 0.0);
        }
        let mut snapshot = MarketSnapshot::new(Utc::now());
        snapshot.insert(AssetClass::Indices, "VIX", point(35.0));

        let agg = RiskMetricsAggregator::new(&store, &cfg);
        assert!((agg.volatility_percentile(&snapshot) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_dispersion_and_tail() {
        let cfg = ThresholdConfig::default();
        let mut store = HistoricalStore::new(252);
        for i in 0..30 {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            store.record("SPX", 100.0 + sign, 0.0);
            store.record("GOLD", 100.0 + 5.0 * sign, 0.0);
        }
        let mut snapshot = MarketSnapshot::new(Utc::now());
        snapshot.insert(AssetClass::Indices, "SPX", point(100.0));
        snapshot.insert(AssetClass::Commodities, "GOLD", point(100.0));

        let agg = RiskMetricsAggregator::new(&store, &cfg);
        assert!(agg.risk_dispersion(&snapshot) > 0.0);
        assert!(agg.tail_risk(&snapshot) < 0.0);
    }

    #[test]
    fn test_optional_metrics() {
        let cfg = ThresholdConfig::default();
        let mut store = HistoricalStore::new(252);
        for i in 0..25 {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            store.record("US10Y", 4.0 + 0.05 * sign, 0.0);
            store.record("DXY", 104.0 + 0.5 * sign, 0.0);
        }

        let mut snapshot = MarketSnapshot::new(Utc::now());
        snapshot.insert(AssetClass::Indices, "SPX", point(4500.0));
        snapshot.insert(AssetClass::Fx, "DXY", point(104.0));
        let mut bonds = BondSnapshot::default();
        bonds.rates.insert("US10Y".into(), point(4.0));
        snapshot.bonds = Some(bonds);
        snapshot.options = Some(OptionsActivity {
            puts_volume: 80.0,
            calls_volume: 100.0,
        });

        let metrics =
            RiskMetricsAggregator::new(&store, &cfg).aggregate(&snapshot, &CorrelationMatrix::empty());
        let rate_vol = metrics.rate_volatility.unwrap();
        assert!((rate_vol - 0.1 * 252f64.sqrt()).abs() < 1e-6);
        assert!(metrics.currency_volatility.unwrap() > 0.0);
        assert_eq!(metrics.equity_put_call, Some(0.8));
    }
}
