// monitor-common/src/analysis/correlation.rs
// Cross-asset correlation of daily returns.

use super::stats::{pearson, simple_returns};
use super::store::HistoricalStore;
use serde::{Deserialize, Serialize};

/// Symmetric matrix of pairwise return correlations.
///
/// Undefined entries (zero-variance pairs) are `None` and are skipped by every
/// aggregate below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Matrix over every stored asset with at least `min_history` prices.
    pub fn from_store(store: &HistoricalStore, min_history: usize) -> Self {
        Self::lagged(store, min_history, 0)
    }

    /// Same as `from_store`, computed as if the last `lag` observations had
    /// not arrived yet.
    pub fn lagged(store: &HistoricalStore, min_history: usize, lag: usize) -> Self {
        let series = store
            .names()
            .filter_map(|name| {
                let mut prices = store.prices(name);
                prices.truncate(prices.len().saturating_sub(lag));
                (prices.len() >= min_history.max(2)).then(|| (name.to_string(), prices))
            })
            .collect();

        Self::from_price_series(series)
    }

    /// Builds the matrix from raw price series.
    ///
    /// Returns are aligned on their most recent end and truncated to the
    /// shortest series.
    pub fn from_price_series(series: Vec<(String, Vec<f64>)>) -> Self {
        if series.is_empty() {
            return Self::empty();
        }

        let returns: Vec<(String, Vec<f64>)> = series
            .into_iter()
            .map(|(name, prices)| (name, simple_returns(&prices)))
            .collect();

        let common = returns.iter().map(|(_, r)| r.len()).min().unwrap_or(0);
        let aligned: Vec<&[f64]> = returns
            .iter()
            .map(|(_, r)| &r[r.len() - common..])
            .collect();

        let n = aligned.len();
        let mut values = vec![vec![None; n]; n];
        for i in 0..n {
            for j in i..n {
                let rho = pearson(aligned[i], aligned[j]);
                values[i][j] = rho;
                values[j][i] = rho;
            }
        }

        Self {
            names: returns.into_iter().map(|(name, _)| name).collect(),
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.position(a)?;
        let j = self.position(b)?;
        self.values[i][j]
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Defined entries with `i < j`.
    pub fn upper_triangle(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        let n = self.names.len();
        (0..n).flat_map(move |i| {
            ((i + 1)..n).filter_map(move |j| {
                self.values[i][j].map(|rho| (self.names[i].as_str(), self.names[j].as_str(), rho))
            })
        })
    }

    /// Mean absolute correlation over every defined entry, diagonal included.
    pub fn mean_abs(&self) -> Option<f64> {
        let defined: Vec<f64> = self
            .values
            .iter()
            .flatten()
            .filter_map(|v| v.map(f64::abs))
            .collect();
        if defined.is_empty() {
            return None;
        }
        Some(defined.iter().sum::<f64>() / defined.len() as f64)
    }

    /// Mean absolute off-diagonal correlation, ignoring exact zeros. `0.0`
    /// when nothing qualifies.
    pub fn average_pairwise(&self) -> f64 {
        let values: Vec<f64> = self
            .upper_triangle()
            .map(|(_, _, rho)| rho.abs())
            .filter(|rho| *rho != 0.0)
            .collect();
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }
}
