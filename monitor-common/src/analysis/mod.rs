// monitor-common/src/analysis/mod.rs
// ====
// Market Regime & Anomaly Engine
// ====

pub mod anomaly;
pub mod config;
pub mod correlation;
pub mod degraded;
pub mod engine;
pub mod fed;
pub mod indicators;
pub mod regime;
pub mod release;
pub mod risk;
pub mod stats;
pub mod store;
pub mod trend;

pub use anomaly::{Anomaly, AnomalyDetail, AnomalyDetector, AnomalyKind, AnomalySubject, Severity};
pub use config::ThresholdConfig;
pub use correlation::CorrelationMatrix;
pub use degraded::{Assessment, Degradation, Degraded};
pub use engine::{MarketAnalysis, MarketAnalyzer};
pub use fed::{FedAnalysis, FedAnalyzer, PolicyBias};
pub use indicators::LeadingIndicators;
pub use regime::{
    CorrelationRegime, DominantFactor, LiquidityConditions, MarketRegime, RegimeClassifier,
    RiskEnvironment, VolatilityRegime,
};
pub use release::{ReleaseAnalysis, ReleaseAnalyzer};
pub use risk::{RiskMetrics, RiskMetricsAggregator};
pub use store::HistoricalStore;
pub use trend::{TrendClassifier, TrendLabel};
