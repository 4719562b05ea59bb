// monitor-core/tests/monitor_cycle.rs
// End-to-end cycles with scripted collectors, an in-memory archive and a temp outbox.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use monitor_core::analysis::{MarketAnalyzer, ThresholdConfig};
use monitor_core::collectors::{CollectionRunner, Collector, CollectorError};
use monitor_core::config::Settings;
use monitor_core::data::{
    AssetClass, CommunicationType, DataSource, EconomicRelease, FedCommunication, Importance,
    MarketSnapshot, PricePoint, Repository,
};
use monitor_core::notifier::FileOutbox;
use monitor_core::service::MonitorService;
use std::sync::atomic::{AtomicBool, Ordering};

fn snapshot(spx: f64, previous: f64) -> MarketSnapshot {
    let now = Utc::now();
    let mut s = MarketSnapshot::new(now);
    s.insert(AssetClass::Indices, "SPX", PricePoint::from_closes("^GSPC", spx, previous, 0.0, now));
    s.insert(AssetClass::Indices, "VIX", PricePoint::from_closes("^VIX", 16.0, 16.0, 0.0, now));
    s.insert(AssetClass::Fx, "DXY", PricePoint::from_closes("DX-Y.NYB", 104.0, 104.0, 0.0, now));
    s.insert(AssetClass::Commodities, "GOLD", PricePoint::from_closes("GC=F", 2650.0, 2650.0, 0.0, now));
    s
}

/// Returns a +30% SPX shock; fails when `broken` is set.
struct ScriptedMarket {
    broken: AtomicBool,
}

#[async_trait]
impl Collector for ScriptedMarket {
    type Output = MarketSnapshot;

    fn name(&self) -> &str {
        "market"
    }

    async fn collect(&self) -> Result<MarketSnapshot, CollectorError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(CollectorError::NetworkError("upstream timeout".into()));
        }
        Ok(snapshot(130.0, 100.0))
    }

    fn validate(&self, data: &MarketSnapshot) -> bool {
        data.has_class(AssetClass::Indices)
    }
}

struct ScriptedReleases;

#[async_trait]
impl Collector for ScriptedReleases {
    type Output = Vec<EconomicRelease>;

    fn name(&self) -> &str {
        "economic"
    }

    async fn collect(&self) -> Result<Self::Output, CollectorError> {
        Ok(vec![EconomicRelease {
            indicator: "NFP".into(),
            name: "Nonfarm Payrolls".into(),
            value: 159_486.0,
            previous: Some(159_230.0),
            expected: None,
            observation_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            source: DataSource::Bls,
            importance: Importance::High,
        }])
    }

    fn validate(&self, _data: &Self::Output) -> bool {
        true
    }
}

struct ScriptedSpeeches;

#[async_trait]
impl Collector for ScriptedSpeeches {
    type Output = Vec<FedCommunication>;

    fn name(&self) -> &str {
        "fed_speeches"
    }

    async fn collect(&self) -> Result<Self::Output, CollectorError> {
        Ok(vec![FedCommunication {
            published_at: Utc::now() - Duration::hours(6),
            title: "Powell, Economic Outlook".into(),
            url: "https://www.federalreserve.gov/newsevents/speech/powell20250110a.htm".into(),
            speaker: "Powell".into(),
            source: "speeches".into(),
            kind: CommunicationType::Speech,
            full_text: Some(
                "Inflation remains elevated and the labor market is solid; further tightening may be appropriate."
                    .into(),
            ),
        }])
    }

    fn validate(&self, data: &Self::Output) -> bool {
        data.iter().all(|c| !c.url.is_empty())
    }
}

fn settings() -> Settings {
    let mut settings = Settings::from_file("monitor-cycle-test-no-such-file").unwrap();
    // Newsletter is always due in these tests.
    settings.newsletter.send_hour = 0;
    settings.newsletter.send_minute = 0;
    settings
}

/// Analyzer with 25 flat SPX observations already recorded.
fn warmed_analyzer() -> MarketAnalyzer {
    let mut analyzer = MarketAnalyzer::new(ThresholdConfig::default());
    for _ in 0..25 {
        analyzer.analyze(&snapshot(100.0, 100.0));
    }
    analyzer
}

#[tokio::test]
async fn test_full_cycle_persists_alerts_and_publishes() {
    let repository = Repository::connect("sqlite::memory:", 1).await.unwrap();
    let outbox_dir = tempfile::tempdir().unwrap();
    let settings = settings();

    let mut service = MonitorService::new(
        repository,
        warmed_analyzer(),
        CollectionRunner::new(Box::new(ScriptedMarket {
            broken: AtomicBool::new(false),
        })),
        &settings,
    )
    .with_economic(CollectionRunner::new(Box::new(ScriptedReleases)))
    .with_fed_speeches(CollectionRunner::new(Box::new(ScriptedSpeeches)))
    .with_notifier(Box::new(FileOutbox::new(outbox_dir.path(), None)));

    let now = Utc::now();
    let report = service.run_cycle(now).await.unwrap();
    assert!(report.market_analyzed);
    assert_eq!(report.new_releases, 1);
    assert_eq!(report.new_communications, 1);
    assert!(report.newsletter_sent);
    assert!(report.rows_cleaned.is_some());
    assert!(report.alerts_raised >= 1);

    let repo = service.repository();
    let alerts = repo.get_unresolved_alerts().await.unwrap();
    assert!(alerts
        .iter()
        .any(|a| a.alert_type == "anomaly" && a.severity == "high" && a.message.contains("indices_SPX")));

    let stored = repo.get_latest_analysis("market").await.unwrap().unwrap();
    assert_eq!(stored.analysis_type, "market");
    assert!(repo.get_latest_market_regime().await.unwrap().is_some());
    assert!(repo.get_latest_analysis("economic_release").await.unwrap().is_some());
    assert!(repo
        .has_fed_speech("https://www.federalreserve.gov/newsevents/speech/powell20250110a.htm")
        .await
        .unwrap());

    let written: Vec<_> = std::fs::read_dir(outbox_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(written.len(), 1);
    assert!(written[0].starts_with("newsletter-"));
    let html = std::fs::read_to_string(outbox_dir.path().join(&written[0])).unwrap();
    assert!(html.contains("Economic Impact"));
    assert!(html.contains("Fed Implications"));

    // Nothing is due a minute later: no duplicate rows, no second newsletter.
    let quiet = service.run_cycle(now + Duration::seconds(60)).await.unwrap();
    assert!(!quiet.market_analyzed);
    assert!(!quiet.newsletter_sent);

    // After the hourly cadence the same release and speech are recognized as archived.
    let later = service.run_cycle(now + Duration::seconds(3600)).await.unwrap();
    assert!(later.market_analyzed);
    assert_eq!(later.new_releases, 0);
    assert_eq!(later.new_communications, 0);
}

#[tokio::test]
async fn test_collector_failure_raises_data_missing() {
    let repository = Repository::connect("sqlite::memory:", 1).await.unwrap();
    let settings = settings();

    let mut service = MonitorService::new(
        repository,
        MarketAnalyzer::new(ThresholdConfig::default()),
        CollectionRunner::new(Box::new(ScriptedMarket {
            broken: AtomicBool::new(true),
        })),
        &settings,
    );

    let report = service.run_cycle(Utc::now()).await.unwrap();
    assert!(!report.market_analyzed);
    assert_eq!(report.alerts_raised, 1);
    assert!(service.latest_analysis().is_none());

    let alerts = service.repository().get_unresolved_alerts().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, "data_missing");
    assert!(alerts[0].message.contains("upstream timeout"));

    let status = service.collector_status();
    assert_eq!(status[0].0, "market");
    assert_eq!(status[0].1.total_errors, 1);
}

#[tokio::test]
async fn test_archive_failure_leaves_history_untouched() {
    let repository = Repository::connect("sqlite::memory:", 1).await.unwrap();
    let settings = settings();

    let mut service = MonitorService::new(
        repository,
        warmed_analyzer(),
        CollectionRunner::new(Box::new(ScriptedMarket {
            broken: AtomicBool::new(false),
        })),
        &settings,
    );
    assert_eq!(service.analyzer().store().len("SPX"), 25);

    service.repository().get_pool().close().await;

    assert!(service.run_cycle(Utc::now()).await.is_err());
    assert_eq!(service.analyzer().store().len("SPX"), 25);
    assert!(service.latest_analysis().is_none());
}
