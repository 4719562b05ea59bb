// monitor-core/src/bin/monitor/main.rs
// ====
// Market Monitor - entry point
// ====
// Loads configuration, warms the analysis store from the archive and runs
// the monitoring loop until Ctrl-C.
// ====

use anyhow::{Context, Result};
use dotenvy::dotenv;
use monitor_core::analysis::{HistoricalStore, MarketAnalyzer};
use monitor_core::collectors::economic::http_client;
use monitor_core::collectors::{
    BlsClient, BondCollector, CollectionRunner, EconomicDataCollector, FedSpeechCollector,
    FredClient, MarketDataCollector, YahooClient,
};
use monitor_core::config::Settings;
use monitor_core::data::Repository;
use monitor_core::notifier::FileOutbox;
use monitor_core::service::MonitorService;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let settings = Settings::new().context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    info!("Starting Market Monitor");

    // --- Archive ---
    let repository = Repository::connect(&settings.get_db_url(), settings.database.max_connections)
        .await
        .context("opening database")?;

    let mut store = HistoricalStore::new(settings.analysis.lookback_days);
    let warmed = repository.warm_store(&mut store).await?;
    info!("Warmed analysis store with {} archived observations", warmed);
    let analyzer = MarketAnalyzer::with_store(settings.analysis.clone(), store);

    // --- Collectors ---
    let timeout = Duration::from_secs(settings.http.timeout_seconds);
    let client = http_client(&settings.http.user_agent, timeout)?;
    let yahoo = YahooClient::new(&settings.endpoints.yahoo_chart, &settings.http.user_agent, timeout)?;

    let fred = match &settings.api_keys.fred {
        Some(key) => Some(FredClient::new(client.clone(), &settings.endpoints.fred, key)),
        None => {
            warn!("No FRED API key configured; FRED releases and credit spreads are disabled");
            None
        }
    };
    let bls = BlsClient::new(client.clone(), &settings.endpoints.bls, settings.api_keys.bls.as_deref());

    let bonds = BondCollector::new(
        yahoo.clone(),
        settings.symbols.rates.clone(),
        settings.symbols.corporates.clone(),
        settings.symbols.bond_volatility.clone(),
        fred.clone(),
    );
    let market = MarketDataCollector::new(yahoo, &settings.symbols, Some(bonds));
    let economic = EconomicDataCollector::new(fred, bls, settings.releases.clone());
    let speeches = FedSpeechCollector::new(client, settings.fed.feeds.clone(), settings.fed.recency_days)?;

    let mut service = MonitorService::new(
        repository,
        analyzer,
        CollectionRunner::new(Box::new(market)),
        &settings,
    )
    .with_economic(CollectionRunner::new(Box::new(economic)))
    .with_fed_speeches(CollectionRunner::new(Box::new(speeches)));

    if settings.newsletter.enabled {
        service = service.with_notifier(Box::new(FileOutbox::new(
            &settings.newsletter.outbox_dir,
            settings.newsletter.recipient.clone(),
        )));
    }

    // --- Shutdown ---
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                warn!("Unable to listen for Ctrl-C: {}", e);
                // Keep the sender alive so the loop is not told to stop.
                std::future::pending::<()>().await;
            }
        }
    });

    service.run(shutdown_rx).await?;
    info!("Market Monitor stopped");
    Ok(())
}
