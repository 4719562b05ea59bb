// monitor-common/src/analysis/indicators.rs
// Leading indicators and the snapshot lookups shared by the classifiers.

use crate::data::types::{AssetClass, CreditSpreads, MarketSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketBreadth {
    pub advance_decline_ratio: Option<f64>,
    pub above_50ma_pct: f64,
    pub above_200ma_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadingIndicators {
    /// 10y minus 2y Treasury yield.
    pub yield_curve_slope: Option<f64>,
    pub credit_spreads: CreditSpreads,
    pub market_breadth: MarketBreadth,
    /// Composite in `[0, 1]`; higher is calmer.
    pub sentiment: f64,
}

impl LeadingIndicators {
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        Self {
            yield_curve_slope: yield_curve_slope(snapshot),
            credit_spreads: credit_spreads(snapshot),
            market_breadth: market_breadth(snapshot),
            sentiment: sentiment_indicator(snapshot),
        }
    }
}

// --- Lookups ---

/// VIX level when present, finite and non-zero.
pub fn vix_level(snapshot: &MarketSnapshot) -> Option<f64> {
    snapshot
        .get(AssetClass::Indices, "VIX")
        .map(|p| p.price)
        .filter(|v| v.is_finite() && *v != 0.0)
}

pub fn yield_curve_slope(snapshot: &MarketSnapshot) -> Option<f64> {
    let bonds = snapshot.bonds.as_ref()?;
    let slope = bonds.rate("US10Y")? - bonds.rate("US2Y")?;
    slope.is_finite().then_some(slope)
}

pub fn credit_spreads(snapshot: &MarketSnapshot) -> CreditSpreads {
    let Some(bonds) = snapshot.bonds.as_ref() else {
        return CreditSpreads::default();
    };
    CreditSpreads {
        investment_grade: bonds.credit.investment_grade.filter(|v| v.is_finite()),
        high_yield: bonds.credit.high_yield.filter(|v| v.is_finite()),
    }
}

/// High-yield spread when present and non-zero.
pub fn high_yield_spread(snapshot: &MarketSnapshot) -> Option<f64> {
    credit_spreads(snapshot).high_yield.filter(|v| *v != 0.0)
}

/// Equity put/call volume ratio; `None` without options data or call volume.
pub fn put_call_ratio(snapshot: &MarketSnapshot) -> Option<f64> {
    let options = snapshot.options.as_ref()?;
    if options.calls_volume == 0.0 {
        return None;
    }
    let ratio = options.puts_volume / options.calls_volume;
    ratio.is_finite().then_some(ratio)
}

// --- Indicators ---

pub fn market_breadth(snapshot: &MarketSnapshot) -> MarketBreadth {
    let Some(breadth) = snapshot.breadth.as_ref() else {
        return MarketBreadth::default();
    };

    let advance_decline_ratio = match (breadth.advances, breadth.declines) {
        (Some(adv), Some(dec)) if adv != 0.0 && dec != 0.0 => Some(adv / dec.max(1.0)),
        _ => None,
    };

    MarketBreadth {
        advance_decline_ratio,
        above_50ma_pct: breadth.above_50d_ma.unwrap_or(0.0),
        above_200ma_pct: breadth.above_200d_ma.unwrap_or(0.0),
    }
}

/// Average of the available VIX, put/call and credit components, each mapped
/// into `[0, 1]`. Neutral `0.5` when none is available.
pub fn sentiment_indicator(snapshot: &MarketSnapshot) -> f64 {
    let mut components = Vec::with_capacity(3);

    if let Some(vix) = vix_level(snapshot) {
        components.push(((50.0 - vix) / 40.0).clamp(0.0, 1.0));
    }
    if let Some(pc) = put_call_ratio(snapshot) {
        components.push(((1.0 - pc) / 0.5).clamp(0.0, 1.0));
    }
    if let Some(hy) = credit_spreads(snapshot).high_yield {
        components.push(((10.0 - hy) / 8.0).clamp(0.0, 1.0));
    }

    if components.is_empty() {
        return 0.5;
    }
    components.iter().sum::<f64>() / components.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{BondSnapshot, MarketBreadthData, OptionsActivity, PricePoint};
    use chrono::Utc;

    fn point(price: f64) -> PricePoint {
        PricePoint::from_closes("X", price, price, 0.0, Utc::now())
    }

    #[test]
    fn test_slope_and_spreads() {
        let mut snapshot = MarketSnapshot::new(Utc::now());
        assert_eq!(yield_curve_slope(&snapshot), None);

        let mut bonds = BondSnapshot::default();
        bonds.rates.insert("US10Y".into(), point(4.3));
        bonds.rates.insert("US2Y".into(), point(4.8));
        bonds.credit.high_yield = Some(3.4);
        snapshot.bonds = Some(bonds);

        assert!((yield_curve_slope(&snapshot).unwrap() + 0.5).abs() < 1e-9);
        assert_eq!(credit_spreads(&snapshot).high_yield, Some(3.4));
        assert_eq!(credit_spreads(&snapshot).investment_grade, None);
    }

    #[test]
    fn test_sentiment_components() {
        let mut snapshot = MarketSnapshot::new(Utc::now());
        assert_eq!(sentiment_indicator(&snapshot), 0.5);

        snapshot.insert(AssetClass::Indices, "VIX", point(30.0));
        assert!((sentiment_indicator(&snapshot) - 0.5).abs() < 1e-9);

        snapshot.options = Some(OptionsActivity {
            puts_volume: 70.0,
            calls_volume: 100.0,
        });
        // (0.5 + 0.6) / 2
        assert!((sentiment_indicator(&snapshot) - 0.55).abs() < 1e-9);

        snapshot.insert(AssetClass::Indices, "VIX", point(5.0));
        let s = sentiment_indicator(&snapshot);
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn test_breadth() {
        let mut snapshot = MarketSnapshot::new(Utc::now());
        snapshot.breadth = Some(MarketBreadthData {
            advances: Some(300.0),
            declines: Some(150.0),
            above_50d_ma: Some(62.0),
            above_200d_ma: None,
        });
        let breadth = market_breadth(&snapshot);
        assert_eq!(breadth.advance_decline_ratio, Some(2.0));
        assert_eq!(breadth.above_50ma_pct, 62.0);
        assert_eq!(breadth.above_200ma_pct, 0.0);
    }

    #[test]
    fn test_put_call_requires_calls() {
        let mut snapshot = MarketSnapshot::new(Utc::now());
        snapshot.options = Some(OptionsActivity {
            puts_volume: 10.0,
            calls_volume: 0.0,
        });
        assert_eq!(put_call_ratio(&snapshot), None);
    }
}
