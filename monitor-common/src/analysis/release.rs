// monitor-common/src/analysis/release.rs
// Economic release surprise and trend tracking.

use super::stats::{linear_slope, population_std};
use crate::data::types::{EconomicRelease, Importance};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

const HISTORY_PER_INDICATOR: usize = 12;
const TREND_WINDOW: usize = 3;
const FLAT_SLOPE: f64 = 0.001;
const NEUTRAL_SURPRISE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseImpact {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseTrend {
    Improving,
    Deteriorating,
    Stable,
    InsufficientData,
}

impl ReleaseImpact {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseImpact::Positive => "positive",
            ReleaseImpact::Negative => "negative",
            ReleaseImpact::Neutral => "neutral",
        }
    }
}

impl ReleaseTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseTrend::Improving => "improving",
            ReleaseTrend::Deteriorating => "deteriorating",
            ReleaseTrend::Stable => "stable",
            ReleaseTrend::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Observation {
    date: NaiveDate,
    value: f64,
    surprise: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseAnalysis {
    pub indicator: String,
    pub name: String,
    pub observation_date: NaiveDate,
    pub value: f64,
    pub previous: Option<f64>,
    pub expected: Option<f64>,
    pub importance: Importance,
    /// Standardized surprise against expectations.
    pub surprise: f64,
    pub impact: ReleaseImpact,
    pub trend: ReleaseTrend,
}

impl ReleaseAnalysis {
    pub fn is_significant(&self) -> bool {
        self.impact != ReleaseImpact::Neutral || self.importance == Importance::High
    }
}

#[derive(Debug, Default)]
pub struct ReleaseAnalyzer {
    history: HashMap<String, VecDeque<Observation>>,
}

impl ReleaseAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&mut self, release: &EconomicRelease) -> ReleaseAnalysis {
        let surprise = self.surprise(release);

        let history = self.history.entry(release.indicator.clone()).or_default();
        // Re-publishing the same observation replaces it instead of stacking.
        if history.back().is_some_and(|o| o.date == release.observation_date) {
            history.pop_back();
        }
        history.push_back(Observation {
            date: release.observation_date,
            value: release.value,
            surprise,
        });
        while history.len() > HISTORY_PER_INDICATOR {
            history.pop_front();
        }

        let trend = trend_of(history);

        ReleaseAnalysis {
            indicator: release.indicator.clone(),
            name: release.name.clone(),
            observation_date: release.observation_date,
            value: release.value,
            previous: release.previous,
            expected: release.expected,
            importance: release.importance,
            surprise,
            impact: impact_of(surprise),
            trend,
        }
    }

    fn surprise(&self, release: &EconomicRelease) -> f64 {
        let Some(expected) = release.expected.filter(|e| *e != 0.0) else {
            return 0.0;
        };
        let miss = release.value - expected;

        let prior: Vec<f64> = self
            .history
            .get(&release.indicator)
            .map(|h| h.iter().map(|o| o.surprise).collect())
            .unwrap_or_default();

        match population_std(&prior) {
            Some(std) if std > 0.0 => miss / std,
            _ => miss / expected.abs(),
        }
    }
}

fn impact_of(surprise: f64) -> ReleaseImpact {
    if surprise.abs() < NEUTRAL_SURPRISE {
        ReleaseImpact::Neutral
    } else if surprise > 0.0 {
        ReleaseImpact::Positive
    } else {
        ReleaseImpact::Negative
    }
}

fn trend_of(history: &VecDeque<Observation>) -> ReleaseTrend {
    if history.len() < TREND_WINDOW {
        return ReleaseTrend::InsufficientData;
    }
    let recent: Vec<f64> = history
        .iter()
        .skip(history.len() - TREND_WINDOW)
        .map(|o| o.value)
        .collect();

    let slope = linear_slope(&recent);
    if slope.abs() < FLAT_SLOPE {
        ReleaseTrend::Stable
    } else if slope > 0.0 {
        ReleaseTrend::Improving
    } else {
        ReleaseTrend::Deteriorating
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::DataSource;

    fn release(day: u32, value: f64, expected: Option<f64>) -> EconomicRelease {
        EconomicRelease {
            indicator: "NFP".into(),
            name: "Nonfarm Payrolls".into(),
            value,
            previous: None,
            expected,
            observation_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            source: DataSource::Bls,
            importance: Importance::High,
        }
    }

    #[test]
    fn test_surprise_without_expectation() {
        let mut analyzer = ReleaseAnalyzer::new();
        let a = analyzer.analyze(&release(1, 150.0, None));
        assert_eq!(a.surprise, 0.0);
        assert_eq!(a.impact, ReleaseImpact::Neutral);
        assert_eq!(a.trend, ReleaseTrend::InsufficientData);
        assert!(a.is_significant());
    }

    #[test]
    fn test_surprise_relative_to_expected() {
        let mut analyzer = ReleaseAnalyzer::new();
        let a = analyzer.analyze(&release(1, 120.0, Some(100.0)));
        assert!((a.surprise - 0.2).abs() < 1e-9);
        assert_eq!(a.impact, ReleaseImpact::Neutral);

        let b = analyzer.analyze(&release(2, 200.0, Some(100.0)));
        // Single prior surprise has zero spread, fall back to relative miss.
        assert!((b.surprise - 1.0).abs() < 1e-9);
        assert_eq!(b.impact, ReleaseImpact::Positive);
    }

    #[test]
    fn test_trend_and_bounded_history() {
        let mut analyzer = ReleaseAnalyzer::new();
        for day in 1..=20 {
            analyzer.analyze(&release(day, 100.0 + day as f64, None));
        }
        assert_eq!(analyzer.history["NFP"].len(), HISTORY_PER_INDICATOR);

        let a = analyzer.analyze(&release(21, 90.0, None));
        assert_eq!(a.trend, ReleaseTrend::Deteriorating);

        let mut flat = ReleaseAnalyzer::new();
        for day in 1..=3 {
            flat.analyze(&release(day, 4.1, None));
        }
        assert_eq!(flat.analyze(&release(4, 4.1, None)).trend, ReleaseTrend::Stable);
    }

    #[test]
    fn test_republished_observation_replaces() {
        let mut analyzer = ReleaseAnalyzer::new();
        analyzer.analyze(&release(1, 100.0, None));
        analyzer.analyze(&release(1, 101.0, None));
        assert_eq!(analyzer.history["NFP"].len(), 1);
    }
}
