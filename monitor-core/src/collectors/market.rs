// collectors/market.rs
// ====
// Market snapshot: indices, FX, commodities, with the bond section attached
// ====

use super::bond::BondCollector;
use super::traits::Collector;
use super::yahoo::YahooClient;
use super::CollectorError;
use crate::config::Symbols;
use async_trait::async_trait;
use chrono::Utc;
use monitor_common::data::{AssetClass, MarketSnapshot};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Classes a snapshot must carry to be usable.
pub const REQUIRED_CLASSES: [AssetClass; 3] =
    [AssetClass::Indices, AssetClass::Fx, AssetClass::Commodities];

pub struct MarketDataCollector {
    yahoo: YahooClient,
    tables: Vec<(AssetClass, BTreeMap<String, String>)>,
    bonds: Option<BondCollector>,
}

impl MarketDataCollector {
    pub fn new(yahoo: YahooClient, symbols: &Symbols, bonds: Option<BondCollector>) -> Self {
        Self {
            yahoo,
            tables: vec![
                (AssetClass::Indices, symbols.indices.clone()),
                (AssetClass::Fx, symbols.fx.clone()),
                (AssetClass::Commodities, symbols.commodities.clone()),
            ],
            bonds,
        }
    }
}

/// True when every required class has at least one observation.
pub fn has_required_classes(snapshot: &MarketSnapshot) -> bool {
    REQUIRED_CLASSES.iter().all(|class| snapshot.has_class(*class))
}

#[async_trait]
impl Collector for MarketDataCollector {
    type Output = MarketSnapshot;

    fn name(&self) -> &str {
        "market"
    }

    async fn collect(&self) -> Result<Self::Output, CollectorError> {
        let mut snapshot = MarketSnapshot::new(Utc::now());

        for (class, table) in &self.tables {
            for (name, ticker) in table {
                match self.yahoo.fetch_point(ticker).await {
                    Ok(point) => snapshot.insert(*class, name.clone(), point),
                    Err(e) => warn!("Error collecting {} {} ({}): {}", class, name, ticker, e),
                }
            }
        }

        if let Some(bonds) = &self.bonds {
            match bonds.collect().await {
                Ok(section) if bonds.validate(&section) => snapshot.bonds = Some(section),
                Ok(_) => warn!("Bond section failed validation, snapshot left without bonds"),
                Err(e) => warn!("Bond collection failed: {}", e),
            }
        }

        info!(
            "Collected market snapshot: {} assets, bonds {}",
            snapshot.asset_count(),
            if snapshot.bonds.is_some() { "present" } else { "missing" }
        );
        Ok(snapshot)
    }

    fn validate(&self, data: &Self::Output) -> bool {
        has_required_classes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_common::data::PricePoint;

    #[test]
    fn test_required_classes() {
        let now = Utc::now();
        let mut snapshot = MarketSnapshot::new(now);
        snapshot.insert(AssetClass::Indices, "SPX", PricePoint::from_closes("^GSPC", 5000.0, 4990.0, 1.0, now));
        snapshot.insert(AssetClass::Fx, "DXY", PricePoint::from_closes("DX-Y.NYB", 104.0, 104.2, 0.0, now));
        assert!(!has_required_classes(&snapshot));

        snapshot.insert(AssetClass::Commodities, "GOLD", PricePoint::from_closes("GC=F", 2650.0, 2640.0, 1.0, now));
        assert!(has_required_classes(&snapshot));
    }
}
