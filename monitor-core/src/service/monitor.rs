// service/monitor.rs
// ====
// Monitoring loop: collect, analyze, persist, alert, publish
// ====

use super::schedule::CycleSchedule;
use super::ServiceError;
use crate::collectors::{CollectionRunner, CollectorResponse, CollectorStatus};
use crate::config::Settings;
use crate::notifier::{NewsletterComposer, NewsletterInput, Notifier, NotifyError};
use chrono::{DateTime, Utc};
use monitor_common::analysis::{
    FedAnalysis, FedAnalyzer, MarketAnalysis, MarketAnalyzer, ReleaseAnalysis, ReleaseAnalyzer,
};
use monitor_common::data::{EconomicRelease, FedCommunication, MarketSnapshot, Repository};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

pub const MARKET_ANALYSIS: &str = "market";
pub const RELEASE_ANALYSIS: &str = "economic_release";

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub market_analyzed: bool,
    pub new_releases: usize,
    pub new_communications: usize,
    pub rows_cleaned: Option<u64>,
    pub newsletter_sent: bool,
    pub alerts_raised: usize,
}

pub struct MonitorService {
    repository: Repository,
    analyzer: MarketAnalyzer,
    releases: ReleaseAnalyzer,
    fed: FedAnalyzer,
    market: CollectionRunner<MarketSnapshot>,
    economic: Option<CollectionRunner<Vec<EconomicRelease>>>,
    speeches: Option<CollectionRunner<Vec<FedCommunication>>>,
    notifier: Option<Box<dyn Notifier>>,
    composer: NewsletterComposer,
    schedule: CycleSchedule,
    retention_days: i64,
    tick: Duration,
    error_backoff: Duration,
    // --- State carried into the next newsletter ---
    latest_snapshot: Option<MarketSnapshot>,
    latest_analysis: Option<MarketAnalysis>,
    pending_releases: Vec<ReleaseAnalysis>,
    pending_fed: Vec<FedAnalysis>,
}

impl MonitorService {
    pub fn new(
        repository: Repository,
        analyzer: MarketAnalyzer,
        market: CollectionRunner<MarketSnapshot>,
        settings: &Settings,
    ) -> Self {
        Self {
            repository,
            analyzer,
            releases: ReleaseAnalyzer::new(),
            fed: FedAnalyzer::new(),
            market,
            economic: None,
            speeches: None,
            notifier: None,
            composer: NewsletterComposer::new(),
            schedule: CycleSchedule::from_settings(settings),
            retention_days: settings.database.retention_days,
            tick: settings.schedule.tick(),
            error_backoff: settings.schedule.error_backoff(),
            latest_snapshot: None,
            latest_analysis: None,
            pending_releases: Vec::new(),
            pending_fed: Vec::new(),
        }
    }

    pub fn with_economic(mut self, runner: CollectionRunner<Vec<EconomicRelease>>) -> Self {
        self.economic = Some(runner);
        self
    }

    pub fn with_fed_speeches(mut self, runner: CollectionRunner<Vec<FedCommunication>>) -> Self {
        self.speeches = Some(runner);
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn analyzer(&self) -> &MarketAnalyzer {
        &self.analyzer
    }

    pub fn latest_analysis(&self) -> Option<&MarketAnalysis> {
        self.latest_analysis.as_ref()
    }

    /// Attempt and error bookkeeping per configured collector.
    pub fn collector_status(&self) -> Vec<(String, CollectorStatus)> {
        let mut status = vec![(self.market.name().to_string(), self.market.status())];
        if let Some(runner) = &self.economic {
            status.push((runner.name().to_string(), runner.status()));
        }
        if let Some(runner) = &self.speeches {
            status.push((runner.name().to_string(), runner.status()));
        }
        status
    }

    /// Runs until a shutdown signal arrives.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError> {
        info!(
            "Monitor started (tick {:?}, backoff {:?})",
            self.tick, self.error_backoff
        );

        loop {
            let pause = match self.run_cycle(Utc::now()).await {
                Ok(report) => {
                    debug!("Cycle complete: {:?}", report);
                    self.tick
                }
                Err(e) => {
                    error!("Monitoring cycle failed: {}", e);
                    self.error_backoff
                }
            };

            tokio::select! {
                _ = sleep(pause) => {}
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, stopping monitor");
                    return Ok(());
                }
            }
        }
    }

    /// One pass over every cadence that is due at `now`.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport, ServiceError> {
        let mut report = CycleReport::default();

        if self.schedule.market.is_due(now) {
            self.market_step(&mut report).await?;
            self.schedule.market.mark(now);
        }

        if self.economic.is_some() && self.schedule.economic.is_due(now) {
            self.economic_step(now, &mut report).await?;
            self.schedule.economic.mark(now);
        }

        if self.speeches.is_some() && self.schedule.fed.is_due(now) {
            self.fed_step(&mut report).await?;
            self.schedule.fed.mark(now);
        }

        if self.schedule.cleanup.is_due(now) {
            report.rows_cleaned = Some(self.repository.cleanup_old_data(self.retention_days).await?);
            self.schedule.cleanup.mark(now);
        }

        if self.notifier.is_some() && self.schedule.newsletter.is_due(now) {
            report.newsletter_sent = self.newsletter_step(now).await?;
            self.schedule.newsletter.mark(now);
        }

        Ok(report)
    }

    // --- Steps ---

    async fn market_step(&mut self, report: &mut CycleReport) -> Result<(), ServiceError> {
        let response = self.market.execute_collection().await;
        let Some(snapshot) = self.accept(response, "market", report).await? else {
            return Ok(());
        };

        // History only advances once the archive holds the same observation.
        let analysis = self.analyzer.evaluate(&snapshot);
        self.repository.store_market_snapshot(&snapshot).await?;
        self.repository
            .store_market_regime(analysis.timestamp, &analysis.regime)
            .await?;
        self.repository
            .store_analysis(analysis.timestamp, MARKET_ANALYSIS, &analysis, analysis.confidence())
            .await?;
        self.analyzer.update_history(&snapshot);
        info!(
            risk = %analysis.regime.risk_environment,
            volatility = %analysis.regime.volatility_regime,
            anomalies = analysis.anomalies.len(),
            "Market analysis archived"
        );

        for anomaly in analysis.high_severity() {
            let message = anomaly.describe();
            warn!("High severity anomaly: {}", message);
            self.repository.create_alert("anomaly", "high", &message).await?;
            report.alerts_raised += 1;
        }

        report.market_analyzed = true;
        self.latest_snapshot = Some(snapshot);
        self.latest_analysis = Some(analysis);
        Ok(())
    }

    async fn economic_step(&mut self, now: DateTime<Utc>, report: &mut CycleReport) -> Result<(), ServiceError> {
        let Some(runner) = self.economic.as_mut() else {
            return Ok(());
        };
        let response = runner.execute_collection().await;
        let Some(releases) = self.accept(response, "economic", report).await? else {
            return Ok(());
        };

        for release in releases {
            if !self.repository.store_economic_release(&release).await? {
                continue;
            }
            let analysis = self.releases.analyze(&release);
            info!(
                "New release {} {} = {} ({}, {})",
                analysis.indicator,
                analysis.observation_date,
                analysis.value,
                analysis.impact.as_str(),
                analysis.trend.as_str()
            );
            self.repository
                .store_analysis(now, RELEASE_ANALYSIS, &analysis, 1.0)
                .await?;
            report.new_releases += 1;
            if analysis.is_significant() {
                self.pending_releases.push(analysis);
            }
        }
        Ok(())
    }

    async fn fed_step(&mut self, report: &mut CycleReport) -> Result<(), ServiceError> {
        let Some(runner) = self.speeches.as_mut() else {
            return Ok(());
        };
        let response = runner.execute_collection().await;
        let Some(communications) = self.accept(response, "fed_speeches", report).await? else {
            return Ok(());
        };

        // Oldest first so the shift tracking sees speeches in order.
        let mut communications = communications;
        communications.sort_by_key(|c| c.published_at);

        for communication in communications {
            if self.repository.has_fed_speech(&communication.url).await? {
                continue;
            }
            let analysis = self.fed.analyze(&communication);
            self.repository
                .store_fed_speech(&communication, Some(&analysis))
                .await?;
            info!(
                "Fed communication from {}: {} (score {:+.2})",
                analysis.speaker,
                analysis.policy_bias.as_str(),
                analysis.hawkish_score
            );
            report.new_communications += 1;
            if analysis.is_significant() {
                self.pending_fed.push(analysis);
            }
        }
        Ok(())
    }

    async fn newsletter_step(&mut self, now: DateTime<Utc>) -> Result<bool, ServiceError> {
        let Some(notifier) = self.notifier.as_ref() else {
            return Ok(false);
        };

        let input = NewsletterInput {
            analysis: self.latest_analysis.as_ref(),
            snapshot: self.latest_snapshot.as_ref(),
            releases: &self.pending_releases,
            fed: &self.pending_fed,
        };

        let newsletter = match self.composer.compose(input, now) {
            Ok(newsletter) => newsletter,
            Err(NotifyError::Empty(reason)) => {
                info!("Skipping newsletter: {}", reason);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        notifier.send(&newsletter).await?;
        self.pending_releases.clear();
        self.pending_fed.clear();
        Ok(true)
    }

    /// Unwraps a collection; failures become `data_missing` alerts.
    async fn accept<T>(
        &self,
        response: CollectorResponse<T>,
        collector: &str,
        report: &mut CycleReport,
    ) -> Result<Option<T>, ServiceError> {
        if response.success {
            return Ok(response.data);
        }

        let reason = response.error.unwrap_or_else(|| "unknown error".to_string());
        let message = format!("{} collection failed: {}", collector, reason);
        self.repository
            .create_alert("data_missing", "medium", &message)
            .await?;
        report.alerts_raised += 1;
        Ok(None)
    }
}
