// monitor-common/src/analysis/regime.rs
// ====
// Market Monitor - Regime classification
// Risk appetite, volatility, liquidity, correlation and macro drivers
// ====

use super::config::ThresholdConfig;
use super::correlation::CorrelationMatrix;
use super::degraded::{Assessment, Degradation, Degraded};
use super::indicators::{high_yield_spread, vix_level, yield_curve_slope};
use super::stats::mean;
use super::store::HistoricalStore;
use super::trend::TrendClassifier;
use crate::data::types::{AssetClass, MarketSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskEnvironment {
    RiskOn,
    RiskOff,
    Neutral,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Low,
    Normal,
    Elevated,
    High,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityConditions {
    Ample,
    Normal,
    Tight,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationRegime {
    RiskOffCorrelation,
    Normal,
    Choppy,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DominantFactor {
    RiskAversion,
    RecessionRisk,
    GrowthExpectations,
    CreditStress,
    DollarDominance,
    DollarWeakness,
    CommodityPressure,
    NoDominantFactor,
}

impl RiskEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskEnvironment::RiskOn => "risk_on",
            RiskEnvironment::RiskOff => "risk_off",
            RiskEnvironment::Neutral => "neutral",
            RiskEnvironment::Unknown => "unknown",
        }
    }
}

impl VolatilityRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityRegime::Low => "low",
            VolatilityRegime::Normal => "normal",
            VolatilityRegime::Elevated => "elevated",
            VolatilityRegime::High => "high",
            VolatilityRegime::Unknown => "unknown",
        }
    }
}

impl LiquidityConditions {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiquidityConditions::Ample => "ample",
            LiquidityConditions::Normal => "normal",
            LiquidityConditions::Tight => "tight",
            LiquidityConditions::Unknown => "unknown",
        }
    }
}

impl CorrelationRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationRegime::RiskOffCorrelation => "risk_off_correlation",
            CorrelationRegime::Normal => "normal",
            CorrelationRegime::Choppy => "choppy",
            CorrelationRegime::Unknown => "unknown",
        }
    }
}

impl DominantFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            DominantFactor::RiskAversion => "risk_aversion",
            DominantFactor::RecessionRisk => "recession_risk",
            DominantFactor::GrowthExpectations => "growth_expectations",
            DominantFactor::CreditStress => "credit_stress",
            DominantFactor::DollarDominance => "dollar_dominance",
            DominantFactor::DollarWeakness => "dollar_weakness",
            DominantFactor::CommodityPressure => "commodity_pressure",
            DominantFactor::NoDominantFactor => "no_dominant_factor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DominantFactor::RiskAversion => "Volatility is pricing broad risk aversion",
            DominantFactor::RecessionRisk => "Inverted curve signals recession risk",
            DominantFactor::GrowthExpectations => "Steep curve reflects growth expectations",
            DominantFactor::CreditStress => "High-yield spreads show credit stress",
            DominantFactor::DollarDominance => "Strong dollar move",
            DominantFactor::DollarWeakness => "Weak dollar move",
            DominantFactor::CommodityPressure => "Large commodity price moves",
            DominantFactor::NoDominantFactor => "No single macro driver stands out",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(
    RiskEnvironment,
    VolatilityRegime,
    LiquidityConditions,
    CorrelationRegime,
    DominantFactor
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRegime {
    pub risk_environment: RiskEnvironment,
    pub volatility_regime: VolatilityRegime,
    pub liquidity_conditions: LiquidityConditions,
    pub correlation_regime: CorrelationRegime,
    pub dominant_factors: BTreeSet<DominantFactor>,
    /// Components that fell back to `unknown`, with the reason.
    pub degradations: Vec<Degradation>,
}

impl MarketRegime {
    pub fn factor_names(&self) -> Vec<String> {
        self.dominant_factors
            .iter()
            .map(|f| f.as_str().to_string())
            .collect()
    }

    /// Share of the four labelled components that resolved.
    pub fn confidence(&self) -> f64 {
        let resolved = [
            self.risk_environment != RiskEnvironment::Unknown,
            self.volatility_regime != VolatilityRegime::Unknown,
            self.liquidity_conditions != LiquidityConditions::Unknown,
            self.correlation_regime != CorrelationRegime::Unknown,
        ]
        .iter()
        .filter(|r| **r)
        .count();
        resolved as f64 / 4.0
    }
}

// =================================================================
// Classifier
// =================================================================

pub struct RegimeClassifier<'a> {
    store: &'a HistoricalStore,
    config: &'a ThresholdConfig,
}

impl<'a> RegimeClassifier<'a> {
    pub fn new(store: &'a HistoricalStore, config: &'a ThresholdConfig) -> Self {
        Self { store, config }
    }

    pub fn classify(&self, snapshot: &MarketSnapshot) -> MarketRegime {
        let matrix = CorrelationMatrix::from_store(self.store, self.config.min_history);
        self.classify_with(snapshot, &matrix)
    }

    /// Classifies against a correlation matrix computed by the caller.
    pub fn classify_with(
        &self,
        snapshot: &MarketSnapshot,
        correlations: &CorrelationMatrix,
    ) -> MarketRegime {
        let mut degradations = Vec::new();

        let risk_environment = settle(
            "risk_environment",
            self.risk_environment(snapshot),
            &mut degradations,
        );
        let volatility_regime = settle(
            "volatility_regime",
            self.volatility_regime(snapshot),
            &mut degradations,
        );
        let liquidity_conditions = settle(
            "liquidity_conditions",
            self.liquidity_conditions(snapshot),
            &mut degradations,
        );
        let correlation_regime = settle(
            "correlation_regime",
            self.correlation_regime(correlations),
            &mut degradations,
        );

        MarketRegime {
            risk_environment,
            volatility_regime,
            liquidity_conditions,
            correlation_regime,
            dominant_factors: self.dominant_factors(snapshot),
            degradations,
        }
    }

    pub fn risk_environment(&self, snapshot: &MarketSnapshot) -> Assessment<RiskEnvironment> {
        let vix = snapshot
            .get(AssetClass::Indices, "VIX")
            .ok_or_else(|| Degraded::missing("indices.VIX"))?
            .price;
        let spx = snapshot
            .get(AssetClass::Indices, "SPX")
            .ok_or_else(|| Degraded::missing("indices.SPX"))?;
        if !vix.is_finite() {
            return Err(Degraded::Computation(format!("non-finite VIX level {vix}")));
        }

        let mut score = 0i32;

        if vix < self.config.vix.low {
            score += 2;
        } else if vix > self.config.vix.high {
            score -= 2;
        }

        let spx_trend = TrendClassifier::new(self.store, self.config).classify_trend("SPX", spx.price);
        if spx_trend.is_up() {
            score += 1;
        } else if spx_trend.is_down() {
            score -= 1;
        }

        if let Some(hy) = high_yield_spread(snapshot) {
            if hy < self.config.factors.credit_spread_tight {
                score += 1;
            } else if hy > self.config.factors.credit_spread_stress {
                score -= 1;
            }
        }

        Ok(if score >= 2 {
            RiskEnvironment::RiskOn
        } else if score <= -2 {
            RiskEnvironment::RiskOff
        } else {
            RiskEnvironment::Neutral
        })
    }

    pub fn volatility_regime(&self, snapshot: &MarketSnapshot) -> Assessment<VolatilityRegime> {
        let vix = vix_level(snapshot).ok_or_else(|| Degraded::missing("indices.VIX"))?;
        let t = &self.config.vix;

        Ok(if vix < t.low {
            VolatilityRegime::Low
        } else if vix < t.elevated {
            VolatilityRegime::Normal
        } else if vix < t.high {
            VolatilityRegime::Elevated
        } else {
            VolatilityRegime::High
        })
    }

    pub fn liquidity_conditions(
        &self,
        snapshot: &MarketSnapshot,
    ) -> Assessment<LiquidityConditions> {
        let mut score = 0i32;
        let mut components = 0usize;

        for (_, name, point) in snapshot.iter_assets() {
            if point.volume <= 0.0 {
                continue;
            }
            let Some(average) = mean(&self.store.volumes(name)).filter(|m| *m > 0.0) else {
                continue;
            };
            score += if point.volume > average { 1 } else { -1 };
            components += 1;
        }

        let spreads: Vec<f64> = snapshot.bid_ask_spreads.values().copied().collect();
        if let Some(avg_spread) = mean(&spreads) {
            let t = &self.config.liquidity;
            if avg_spread < t.tight {
                score += 1;
            } else if avg_spread > t.stressed {
                score -= 2;
            }
            components += 1;
        }

        if components == 0 {
            return Err(Degraded::missing("volume history or bid-ask spreads"));
        }

        let normalized = score as f64 / components as f64;
        Ok(if normalized > 0.5 {
            LiquidityConditions::Ample
        } else if normalized > -0.5 {
            LiquidityConditions::Normal
        } else {
            LiquidityConditions::Tight
        })
    }

    pub fn correlation_regime(
        &self,
        correlations: &CorrelationMatrix,
    ) -> Assessment<CorrelationRegime> {
        let avg = correlations
            .mean_abs()
            .ok_or_else(|| Degraded::InsufficientHistory {
                needed: self.config.min_history,
                available: self.store.names().map(|n| self.store.len(n)).max().unwrap_or(0),
            })?;

        let t = &self.config.correlation;
        Ok(if avg > t.high {
            CorrelationRegime::RiskOffCorrelation
        } else if avg > t.normal {
            CorrelationRegime::Normal
        } else {
            CorrelationRegime::Choppy
        })
    }

    pub fn dominant_factors(&self, snapshot: &MarketSnapshot) -> BTreeSet<DominantFactor> {
        let f = &self.config.factors;
        let mut factors = BTreeSet::new();

        if vix_level(snapshot).is_some_and(|vix| vix > self.config.vix.high) {
            factors.insert(DominantFactor::RiskAversion);
        }

        if let Some(slope) = yield_curve_slope(snapshot) {
            if slope < 0.0 && self.config.flag_curve_inversion {
                factors.insert(DominantFactor::RecessionRisk);
            } else if slope > f.steep_curve {
                factors.insert(DominantFactor::GrowthExpectations);
            }
        }

        if high_yield_spread(snapshot).is_some_and(|hy| hy > f.credit_spread_stress) {
            factors.insert(DominantFactor::CreditStress);
        }

        if let Some(dxy) = snapshot.get(AssetClass::Fx, "DXY") {
            if dxy.change_pct.abs() > f.dollar_move_pct {
                factors.insert(if dxy.change_pct > 0.0 {
                    DominantFactor::DollarDominance
                } else {
                    DominantFactor::DollarWeakness
                });
            }
        }

        let commodity_move = snapshot
            .assets
            .get(&AssetClass::Commodities)
            .is_some_and(|c| c.values().any(|p| p.change_pct > f.commodity_move_pct));
        if commodity_move {
            factors.insert(DominantFactor::CommodityPressure);
        }

        if factors.is_empty() {
            factors.insert(DominantFactor::NoDominantFactor);
        }
        factors
    }
}

/// Unwraps a component outcome, falling back to its `Unknown` label.
fn settle<T: Default>(
    component: &str,
    outcome: Assessment<T>,
    degradations: &mut Vec<Degradation>,
) -> T {
    match outcome {
        Ok(label) => label,
        Err(reason) => {
            warn!(component, %reason, "Regime component degraded");
            degradations.push(Degradation {
                component: component.to_string(),
                reason,
            });
            T::default()
        }
    }
}
