//! Thresholds shared by every classifier of the engine.
//!
//! All components borrow the same `ThresholdConfig`, so a threshold that shows
//! up in more than one place (the high-yield stress level, the VIX high mark)
//! has a single source.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VixThresholds {
    pub low: f64,
    pub elevated: f64,
    pub high: f64,
}

impl Default for VixThresholds {
    fn default() -> Self {
        Self {
            low: 15.0,
            elevated: 25.0,
            high: 35.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationThresholds {
    pub normal: f64,
    pub high: f64,
}

impl Default for CorrelationThresholds {
    fn default() -> Self {
        Self {
            normal: 0.4,
            high: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityThresholds {
    pub tight: f64,
    pub stressed: f64,
}

impl Default for LiquidityThresholds {
    fn default() -> Self {
        Self {
            tight: -0.5,
            stressed: -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyThresholds {
    pub price_zscore: f64,
    pub price_zscore_high: f64,
    pub price_move_pct: f64,
    pub price_move_high_pct: f64,
    pub volume_zscore: f64,
    pub volume_zscore_high: f64,
    pub correlation_change: f64,
    pub correlation_change_high: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            price_zscore: 3.0,
            price_zscore_high: 4.0,
            price_move_pct: 5.0,
            price_move_high_pct: 10.0,
            volume_zscore: 2.5,
            volume_zscore_high: 3.0,
            correlation_change: 0.3,
            correlation_change_high: 0.5,
        }
    }
}

/// Macro levels used by the risk environment and dominant factor rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorThresholds {
    /// High-yield spread below this reads as risk appetite.
    pub credit_spread_tight: f64,
    /// High-yield spread above this reads as credit stress.
    pub credit_spread_stress: f64,
    /// 10y-2y slope above this reads as growth expectations.
    pub steep_curve: f64,
    pub dollar_move_pct: f64,
    pub commodity_move_pct: f64,
}

impl Default for FactorThresholds {
    fn default() -> Self {
        Self {
            credit_spread_tight: 3.0,
            credit_spread_stress: 5.0,
            steep_curve: 1.0,
            dollar_move_pct: 1.0,
            commodity_move_pct: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Ring buffer capacity per symbol.
    pub lookback_days: usize,
    /// Points required before trend, z-score and volatility work is attempted.
    pub min_history: usize,
    pub trend_short_window: usize,
    pub trend_medium_window: usize,
    /// Observations dropped from the tail to build the correlation baseline.
    pub correlation_baseline_lag: usize,
    /// Report `recession_risk` when the 10y-2y slope goes negative.
    pub flag_curve_inversion: bool,
    pub vix: VixThresholds,
    pub correlation: CorrelationThresholds,
    pub liquidity: LiquidityThresholds,
    pub anomaly: AnomalyThresholds,
    pub factors: FactorThresholds,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            lookback_days: 252,
            min_history: 20,
            trend_short_window: 20,
            trend_medium_window: 50,
            correlation_baseline_lag: 30,
            flag_curve_inversion: false,
            vix: VixThresholds::default(),
            correlation: CorrelationThresholds::default(),
            liquidity: LiquidityThresholds::default(),
            anomaly: AnomalyThresholds::default(),
            factors: FactorThresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_overrides_keep_defaults() {
        let cfg: ThresholdConfig =
            serde_json::from_str(r#"{"vix": {"high": 40.0}, "lookback_days": 100}"#).unwrap();

        assert_eq!(cfg.lookback_days, 100);
        assert_eq!(cfg.vix.high, 40.0);
        assert_eq!(cfg.vix.low, 15.0);
        assert_eq!(cfg.anomaly.price_zscore, 3.0);
        assert!(!cfg.flag_curve_inversion);
    }
}
