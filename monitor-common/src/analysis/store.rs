// monitor-common/src/analysis/store.rs
// ====
// Historical store: bounded price/volume history per asset
// ====
//
// Series live in a flat arena; a name index maps each asset to its slot.
// Each slot is a fixed-capacity ring, so appends never reallocate once the
// slot is full and the oldest observation is overwritten in place.

use crate::data::types::MarketSnapshot;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct RingSeries {
    prices: Vec<f64>,
    volumes: Vec<f64>,
    /// Slot of the oldest observation once the ring is full.
    head: usize,
}

impl RingSeries {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            prices: Vec::with_capacity(capacity),
            volumes: Vec::with_capacity(capacity),
            head: 0,
        }
    }

    fn push(&mut self, price: f64, volume: f64, capacity: usize) {
        if self.prices.len() < capacity {
            self.prices.push(price);
            self.volumes.push(volume);
        } else {
            self.prices[self.head] = price;
            self.volumes[self.head] = volume;
            self.head = (self.head + 1) % capacity;
        }
    }

    fn len(&self) -> usize {
        self.prices.len()
    }

    /// Chronological copy of `buf`, oldest first.
    fn ordered(&self, buf: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(buf.len());
        out.extend_from_slice(&buf[self.head..]);
        out.extend_from_slice(&buf[..self.head]);
        out
    }
}

#[derive(Debug, Clone)]
pub struct HistoricalStore {
    capacity: usize,
    series: Vec<RingSeries>,
    index: BTreeMap<String, usize>,
}

impl HistoricalStore {
    pub fn new(lookback_days: usize) -> Self {
        Self {
            capacity: lookback_days.max(1),
            series: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends one observation for every asset in the snapshot.
    /// Non-finite prices are skipped; a non-finite volume is kept as 0.
    pub fn update(&mut self, snapshot: &MarketSnapshot) {
        for (_, name, point) in snapshot.iter_assets() {
            if !point.price.is_finite() {
                continue;
            }
            let volume = if point.volume.is_finite() { point.volume } else { 0.0 };
            self.record(name, point.price, volume);
        }
    }

    pub fn record(&mut self, name: &str, price: f64, volume: f64) {
        let slot = match self.index.get(name) {
            Some(&slot) => slot,
            None => {
                self.series.push(RingSeries::with_capacity(self.capacity));
                let slot = self.series.len() - 1;
                self.index.insert(name.to_string(), slot);
                slot
            }
        };
        self.series[slot].push(price, volume, self.capacity);
    }

    fn slot(&self, name: &str) -> Option<&RingSeries> {
        self.index.get(name).map(|&slot| &self.series[slot])
    }

    /// Price history, oldest first. Empty for unknown assets.
    pub fn prices(&self, name: &str) -> Vec<f64> {
        self.slot(name)
            .map(|s| s.ordered(&s.prices))
            .unwrap_or_default()
    }

    pub fn volumes(&self, name: &str) -> Vec<f64> {
        self.slot(name)
            .map(|s| s.ordered(&s.volumes))
            .unwrap_or_default()
    }

    pub fn len(&self, name: &str) -> usize {
        self.slot(name).map(RingSeries::len).unwrap_or(0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tracked asset names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{AssetClass, PricePoint};
    use chrono::Utc;

    #[test]
    fn test_ring_keeps_most_recent() {
        let mut store = HistoricalStore::new(3);
        for i in 1..=5 {
            store.record("SPX", i as f64, (i * 10) as f64);
        }

        assert_eq!(store.len("SPX"), 3);
        assert_eq!(store.prices("SPX"), vec![3.0, 4.0, 5.0]);
        assert_eq!(store.volumes("SPX"), vec![30.0, 40.0, 50.0]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut store = HistoricalStore::new(252);
        for i in 0..600 {
            store.record("VIX", i as f64, 0.0);
        }
        assert_eq!(store.len("VIX"), 252);
        assert_eq!(store.prices("VIX").last().copied(), Some(599.0));
        assert_eq!(store.prices("VIX").first().copied(), Some(348.0));
    }

    #[test]
    fn test_unknown_asset_is_empty() {
        let store = HistoricalStore::new(10);
        assert!(store.prices("DXY").is_empty());
        assert_eq!(store.len("DXY"), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_from_snapshot() {
        let mut snapshot = MarketSnapshot::new(Utc::now());
        snapshot.insert(
            AssetClass::Indices,
            "SPX",
            PricePoint::from_closes("^GSPC", 4500.0, 4490.0, 1e9, Utc::now()),
        );
        snapshot.insert(
            AssetClass::Commodities,
            "GOLD",
            PricePoint::from_closes("GC=F", 2000.0, 1990.0, 5e4, Utc::now()),
        );

        let mut store = HistoricalStore::new(5);
        store.update(&snapshot);
        store.update(&snapshot);

        assert_eq!(store.prices("SPX"), vec![4500.0, 4500.0]);
        assert_eq!(store.volumes("GOLD"), vec![5e4, 5e4]);
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["GOLD", "SPX"]);
    }

    #[test]
    fn test_update_skips_non_finite_prices() {
        let mut snapshot = MarketSnapshot::new(Utc::now());
        snapshot.insert(
            AssetClass::Indices,
            "SPX",
            PricePoint::from_closes("^GSPC", f64::NAN, 4490.0, 1e9, Utc::now()),
        );
        snapshot.insert(
            AssetClass::Indices,
            "NDX",
            PricePoint::from_closes("^IXIC", f64::INFINITY, 15000.0, 1e9, Utc::now()),
        );
        snapshot.insert(
            AssetClass::Commodities,
            "GOLD",
            PricePoint::from_closes("GC=F", 2000.0, 1990.0, f64::NAN, Utc::now()),
        );

        let mut store = HistoricalStore::new(5);
        store.update(&snapshot);

        assert_eq!(store.len("SPX"), 0);
        assert_eq!(store.len("NDX"), 0);
        assert!(!store.contains("SPX"));
        assert_eq!(store.prices("GOLD"), vec![2000.0]);
        assert_eq!(store.volumes("GOLD"), vec![0.0]);
    }
}
