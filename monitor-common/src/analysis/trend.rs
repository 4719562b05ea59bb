use super::config::ThresholdConfig;
use super::store::HistoricalStore;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    StrongUptrend,
    Uptrend,
    Neutral,
    Downtrend,
    StrongDowntrend,
    InsufficientData,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::StrongUptrend => "strong_uptrend",
            TrendLabel::Uptrend => "uptrend",
            TrendLabel::Neutral => "neutral",
            TrendLabel::Downtrend => "downtrend",
            TrendLabel::StrongDowntrend => "strong_downtrend",
            TrendLabel::InsufficientData => "insufficient_data",
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, TrendLabel::StrongUptrend | TrendLabel::Uptrend)
    }

    pub fn is_down(&self) -> bool {
        matches!(self, TrendLabel::StrongDowntrend | TrendLabel::Downtrend)
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moving-average trend of one asset against its stored history.
pub struct TrendClassifier<'a> {
    store: &'a HistoricalStore,
    config: &'a ThresholdConfig,
}

impl<'a> TrendClassifier<'a> {
    pub fn new(store: &'a HistoricalStore, config: &'a ThresholdConfig) -> Self {
        Self { store, config }
    }

    pub fn classify_trend(&self, name: &str, current_price: f64) -> TrendLabel {
        let prices = self.store.prices(name);
        if prices.len() < self.config.min_history.max(self.config.trend_short_window) {
            return TrendLabel::InsufficientData;
        }

        let Some(ma_short) = calculate_sma(&prices, self.config.trend_short_window) else {
            return TrendLabel::InsufficientData;
        };
        // Short history falls back to the short average for the medium leg.
        let ma_medium =
            calculate_sma(&prices, self.config.trend_medium_window).unwrap_or(ma_short);

        if current_price > ma_short && ma_short > ma_medium {
            TrendLabel::StrongUptrend
        } else if current_price > ma_short {
            TrendLabel::Uptrend
        } else if current_price < ma_short && ma_short < ma_medium {
            TrendLabel::StrongDowntrend
        } else if current_price < ma_short {
            TrendLabel::Downtrend
        } else {
            TrendLabel::Neutral
        }
    }
}

/// Mean of the last `period` values; `None` when fewer are available.
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}
