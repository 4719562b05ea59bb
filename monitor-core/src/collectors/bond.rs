// collectors/bond.rs
// ====
// Fixed income: treasury curve, credit ETFs, MOVE, OAS credit spreads
// ====

use super::economic::FredClient;
use super::traits::Collector;
use super::yahoo::YahooClient;
use super::CollectorError;
use async_trait::async_trait;
use monitor_common::data::{BondMetrics, BondSnapshot, CreditSpreads, PricePoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// ICE BofA option-adjusted spreads, in percent.
pub const IG_OAS_SERIES: &str = "BAMLC0A0CM";
pub const HY_OAS_SERIES: &str = "BAMLH0A0HYM2";

/// Curve spreads as (name, short tenor, long tenor).
pub const SPREAD_DEFINITIONS: [(&str, &str, &str); 2] =
    [("2s10s", "US2Y", "US10Y"), ("5s30s", "US5Y", "US30Y")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveShape {
    Inverted,
    Flat,
    ModeratelySteep,
    Steep,
}

impl CurveShape {
    /// Shape from the 2s10s spread in percentage points.
    pub fn from_spread(twos_tens: f64) -> Self {
        if twos_tens < -0.1 {
            CurveShape::Inverted
        } else if twos_tens < 0.1 {
            CurveShape::Flat
        } else if twos_tens < 0.5 {
            CurveShape::ModeratelySteep
        } else {
            CurveShape::Steep
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CurveShape::Inverted => "inverted",
            CurveShape::Flat => "flat",
            CurveShape::ModeratelySteep => "moderately_steep",
            CurveShape::Steep => "steep",
        }
    }
}

impl fmt::Display for CurveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn curve_spreads(rates: &BTreeMap<String, PricePoint>) -> BTreeMap<String, f64> {
    SPREAD_DEFINITIONS
        .iter()
        .filter_map(|(name, short, long)| {
            let short = rates.get(*short)?.price;
            let long = rates.get(*long)?.price;
            Some((name.to_string(), long - short))
        })
        .collect()
}

pub fn bond_metrics(move_level: Option<f64>) -> BondMetrics {
    match move_level.filter(|v| *v > 0.0) {
        Some(level) => BondMetrics {
            volatility: level,
            stress_index: level / 100.0,
            ..BondMetrics::default()
        },
        None => BondMetrics::default(),
    }
}

pub struct BondCollector {
    yahoo: YahooClient,
    rates: BTreeMap<String, String>,
    corporates: BTreeMap<String, String>,
    volatility_ticker: String,
    fred: Option<FredClient>,
}

impl BondCollector {
    pub fn new(
        yahoo: YahooClient,
        rates: BTreeMap<String, String>,
        corporates: BTreeMap<String, String>,
        volatility_ticker: String,
        fred: Option<FredClient>,
    ) -> Self {
        Self {
            yahoo,
            rates,
            corporates,
            volatility_ticker,
            fred,
        }
    }

    async fn collect_table(&self, table: &BTreeMap<String, String>) -> BTreeMap<String, PricePoint> {
        let mut points = BTreeMap::new();
        for (name, ticker) in table {
            match self.yahoo.fetch_point(ticker).await {
                Ok(point) => {
                    points.insert(name.clone(), point);
                }
                Err(e) => warn!("Error collecting {} ({}): {}", name, ticker, e),
            }
        }
        points
    }

    async fn collect_credit(&self) -> CreditSpreads {
        let Some(fred) = &self.fred else {
            return CreditSpreads::default();
        };

        CreditSpreads {
            investment_grade: latest_spread(fred, IG_OAS_SERIES).await,
            high_yield: latest_spread(fred, HY_OAS_SERIES).await,
        }
    }
}

async fn latest_spread(fred: &FredClient, series: &str) -> Option<f64> {
    match fred.latest_value(series).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Error collecting credit spread {}: {}", series, e);
            None
        }
    }
}

#[async_trait]
impl Collector for BondCollector {
    type Output = BondSnapshot;

    fn name(&self) -> &str {
        "bonds"
    }

    async fn collect(&self) -> Result<Self::Output, CollectorError> {
        let rates = self.collect_table(&self.rates).await;
        let corporates = self.collect_table(&self.corporates).await;

        let move_level = match self.yahoo.fetch_point(&self.volatility_ticker).await {
            Ok(point) => Some(point.price),
            Err(e) => {
                warn!("Error collecting MOVE index: {}", e);
                None
            }
        };

        let spreads = curve_spreads(&rates);
        if let Some(twos_tens) = spreads.get("2s10s") {
            info!("Yield curve 2s10s {:.2} ({})", twos_tens, CurveShape::from_spread(*twos_tens));
        }

        Ok(BondSnapshot {
            spreads,
            credit: self.collect_credit().await,
            metrics: bond_metrics(move_level),
            rates,
            corporates,
        })
    }

    fn validate(&self, data: &Self::Output) -> bool {
        !data.rates.is_empty()
            && data.metrics.volatility >= 0.0
            && data.metrics.stress_index >= 0.0
    }
}
