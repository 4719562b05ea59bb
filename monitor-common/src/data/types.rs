// monitor-common/src/data/types.rs
// Market Monitor - shared data model
// =================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =================================================================
// Errors
// =================================================================

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type DataResult<T> = Result<T, DataError>;

// =================================================================
// Market snapshot
// =================================================================

/// Asset class a price observation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Indices,
    Fx,
    Commodities,
    Rates,
    Corporates,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Indices => "indices",
            AssetClass::Fx => "fx",
            AssetClass::Commodities => "commodities",
            AssetClass::Rates => "rates",
            AssetClass::Corporates => "corporates",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Upstream ticker the observation was fetched with (e.g. `^GSPC`).
    pub symbol: String,
    pub price: f64,
    /// Percent change against the previous close.
    pub change_pct: f64,
    pub volume: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
    pub timestamp: DateTime<Utc>,
}

impl PricePoint {
    /// Builds a point from the last two closes, deriving the percent change.
    pub fn from_closes(
        symbol: impl Into<String>,
        current: f64,
        previous: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let change_pct = if previous != 0.0 {
            (current / previous - 1.0) * 100.0
        } else {
            0.0
        };

        Self {
            symbol: symbol.into(),
            price: current,
            change_pct,
            volume,
            open: current,
            high: current,
            low: current,
            previous_close: previous,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditSpreads {
    pub investment_grade: Option<f64>,
    pub high_yield: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondMetrics {
    /// MOVE index level.
    pub volatility: f64,
    pub liquidity: f64,
    pub stress_index: f64,
}

impl Default for BondMetrics {
    fn default() -> Self {
        Self {
            volatility: 0.0,
            liquidity: 1.0,
            stress_index: 0.0,
        }
    }
}

/// Fixed-income section of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BondSnapshot {
    /// Treasury yields keyed by tenor name (`US2Y`, `US10Y`, ...).
    pub rates: BTreeMap<String, PricePoint>,
    pub corporates: BTreeMap<String, PricePoint>,
    /// Curve spreads keyed by name (`2s10s`, `5s30s`).
    pub spreads: BTreeMap<String, f64>,
    pub credit: CreditSpreads,
    pub metrics: BondMetrics,
}

impl BondSnapshot {
    pub fn rate(&self, tenor: &str) -> Option<f64> {
        self.rates.get(tenor).map(|p| p.price)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsActivity {
    pub puts_volume: f64,
    pub calls_volume: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketBreadthData {
    pub advances: Option<f64>,
    pub declines: Option<f64>,
    pub above_50d_ma: Option<f64>,
    pub above_200d_ma: Option<f64>,
}

/// Everything observed in one collection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    pub assets: BTreeMap<AssetClass, BTreeMap<String, PricePoint>>,
    pub bonds: Option<BondSnapshot>,
    /// Bid-ask spread measure per asset name.
    pub bid_ask_spreads: BTreeMap<String, f64>,
    pub options: Option<OptionsActivity>,
    pub breadth: Option<MarketBreadthData>,
}

impl MarketSnapshot {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            assets: BTreeMap::new(),
            bonds: None,
            bid_ask_spreads: BTreeMap::new(),
            options: None,
            breadth: None,
        }
    }

    pub fn insert(&mut self, class: AssetClass, name: impl Into<String>, point: PricePoint) {
        self.assets.entry(class).or_default().insert(name.into(), point);
    }

    pub fn get(&self, class: AssetClass, name: &str) -> Option<&PricePoint> {
        match class {
            AssetClass::Rates => self.bonds.as_ref().and_then(|b| b.rates.get(name)),
            AssetClass::Corporates => self.bonds.as_ref().and_then(|b| b.corporates.get(name)),
            _ => self.assets.get(&class).and_then(|assets| assets.get(name)),
        }
    }

    /// True when the class carries at least one observation.
    pub fn has_class(&self, class: AssetClass) -> bool {
        match class {
            AssetClass::Rates => self.bonds.as_ref().is_some_and(|b| !b.rates.is_empty()),
            AssetClass::Corporates => self
                .bonds
                .as_ref()
                .is_some_and(|b| !b.corporates.is_empty()),
            _ => self.assets.get(&class).is_some_and(|a| !a.is_empty()),
        }
    }

    /// Every observed asset, bond section included, in a stable order.
    pub fn iter_assets(&self) -> impl Iterator<Item = (AssetClass, &str, &PricePoint)> + '_ {
        let plain = self.assets.iter().flat_map(|(class, assets)| {
            assets
                .iter()
                .map(move |(name, point)| (*class, name.as_str(), point))
        });

        let bonds = self.bonds.iter().flat_map(|b| {
            let rates = b
                .rates
                .iter()
                .map(|(name, point)| (AssetClass::Rates, name.as_str(), point));
            let corporates = b
                .corporates
                .iter()
                .map(|(name, point)| (AssetClass::Corporates, name.as_str(), point));
            rates.chain(corporates)
        });

        plain.chain(bonds)
    }

    pub fn asset_count(&self) -> usize {
        self.iter_assets().count()
    }
}

// =================================================================
// Economic releases
// =================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Fred,
    Bls,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Fred => "FRED",
            DataSource::Bls => "BLS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    Medium,
    High,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "low",
            Importance::Medium => "medium",
            Importance::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicRelease {
    /// Short indicator id (`NFP`, `CPI`, ...).
    pub indicator: String,
    pub name: String,
    pub value: f64,
    pub previous: Option<f64>,
    pub expected: Option<f64>,
    pub observation_date: NaiveDate,
    pub source: DataSource,
    pub importance: Importance,
}

// =================================================================
// Fed communications
// =================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationType {
    FomcStatement,
    FomcMinutes,
    Testimony,
    Speech,
    Other,
}

impl CommunicationType {
    /// Derives the communication type from the item title and the feed it came from.
    pub fn classify(title: &str, source: &str) -> Self {
        let title = title.to_lowercase();
        let source = source.to_lowercase();

        if title.contains("fomc statement") {
            CommunicationType::FomcStatement
        } else if title.contains("minutes") {
            CommunicationType::FomcMinutes
        } else if title.contains("testimony") || source.contains("testimony") {
            CommunicationType::Testimony
        } else if source.contains("speech") || title.contains("speech") {
            CommunicationType::Speech
        } else {
            CommunicationType::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationType::FomcStatement => "fomc_statement",
            CommunicationType::FomcMinutes => "fomc_minutes",
            CommunicationType::Testimony => "testimony",
            CommunicationType::Speech => "speech",
            CommunicationType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FedCommunication {
    pub published_at: DateTime<Utc>,
    pub title: String,
    pub url: String,
    pub speaker: String,
    /// Feed the item was read from.
    pub source: String,
    pub kind: CommunicationType,
    pub full_text: Option<String>,
}

// =================================================================
// Persisted records
// =================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub alert_type: String,
    pub severity: String,
    pub message: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub analysis_type: String,
    pub content: serde_json::Value,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub risk_environment: String,
    pub volatility_regime: String,
    pub liquidity_conditions: String,
    pub correlation_regime: String,
    pub dominant_factors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(price: f64) -> PricePoint {
        PricePoint::from_closes("X", price, price, 0.0, Utc::now())
    }

    #[test]
    fn test_change_from_closes() {
        let p = PricePoint::from_closes("^GSPC", 105.0, 100.0, 10.0, Utc::now());
        assert!((p.change_pct - 5.0).abs() < 1e-9);

        let flat = PricePoint::from_closes("^GSPC", 105.0, 0.0, 10.0, Utc::now());
        assert_eq!(flat.change_pct, 0.0);
    }

    #[test]
    fn test_iter_assets_includes_bonds() {
        let mut snapshot = MarketSnapshot::new(Utc::now());
        snapshot.insert(AssetClass::Indices, "SPX", point(4500.0));
        snapshot.insert(AssetClass::Fx, "DXY", point(104.0));

        let mut bonds = BondSnapshot::default();
        bonds.rates.insert("US10Y".into(), point(4.2));
        snapshot.bonds = Some(bonds);

        let names: Vec<&str> = snapshot.iter_assets().map(|(_, n, _)| n).collect();
        assert_eq!(names, vec!["SPX", "DXY", "US10Y"]);
        assert!(snapshot.has_class(AssetClass::Rates));
        assert!(!snapshot.has_class(AssetClass::Commodities));
        assert_eq!(snapshot.get(AssetClass::Rates, "US10Y").map(|p| p.price), Some(4.2));
    }

    #[test]
    fn test_communication_type() {
        assert_eq!(
            CommunicationType::classify("Federal Reserve issues FOMC statement", "press"),
            CommunicationType::FomcStatement
        );
        assert_eq!(
            CommunicationType::classify("Minutes of the Federal Open Market Committee", "press"),
            CommunicationType::FomcMinutes
        );
        assert_eq!(
            CommunicationType::classify("Powell, Semiannual Monetary Policy Report", "testimony"),
            CommunicationType::Testimony
        );
        assert_eq!(
            CommunicationType::classify("Waller, Economic Outlook", "speeches"),
            CommunicationType::Speech
        );
        assert_eq!(
            CommunicationType::classify("Board announces", "press"),
            CommunicationType::Other
        );
    }
}
