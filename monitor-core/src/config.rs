// monitor-core/src/config.rs
// Market Monitor - configuration
// Layered: built-in defaults, optional config file, MONITOR__* environment.

use config::{Config, ConfigError, Environment, File};
use monitor_common::analysis::ThresholdConfig;
use monitor_common::data::{DataSource, Importance};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    pub retention_days: i64,
}

/// Cadences of the monitoring loop, in seconds.
#[derive(Debug, Deserialize, Clone)]
pub struct Schedule {
    pub tick_seconds: u64,
    pub error_backoff_seconds: u64,
    pub market_data_seconds: u64,
    pub economic_data_seconds: u64,
    pub fed_speeches_seconds: u64,
    pub cleanup_seconds: u64,
}

impl Schedule {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Http {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ApiKeys {
    pub fred: Option<String>,
    pub bls: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Endpoints {
    pub yahoo_chart: String,
    pub fred: String,
    pub bls: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FedFeed {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Fed {
    pub recency_days: i64,
    #[serde(default = "default_fed_feeds")]
    pub feeds: Vec<FedFeed>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Newsletter {
    pub enabled: bool,
    pub outbox_dir: String,
    /// Daily send time, UTC.
    pub send_hour: u32,
    pub send_minute: u32,
    pub recipient: Option<String>,
}

/// One economic series to poll.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReleaseSeries {
    pub indicator: String,
    pub name: String,
    pub source: DataSource,
    pub series_id: String,
    pub importance: Importance,
}

/// Market symbols per asset class: display name -> upstream ticker.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Symbols {
    pub indices: BTreeMap<String, String>,
    pub fx: BTreeMap<String, String>,
    pub commodities: BTreeMap<String, String>,
    pub rates: BTreeMap<String, String>,
    pub corporates: BTreeMap<String, String>,
    pub bond_volatility: String,
}

impl Default for Symbols {
    fn default() -> Self {
        fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(name, ticker)| (name.to_string(), ticker.to_string()))
                .collect()
        }

        Self {
            indices: table(&[
                ("SPX", "^GSPC"),
                ("NDX", "^IXIC"),
                ("DJI", "^DJI"),
                ("RUT", "^RUT"),
                ("VIX", "^VIX"),
            ]),
            fx: table(&[
                ("DXY", "DX-Y.NYB"),
                ("EURUSD", "EUR=X"),
                ("USDJPY", "JPY=X"),
                ("GBPUSD", "GBP=X"),
            ]),
            commodities: table(&[
                ("GOLD", "GC=F"),
                ("OIL", "CL=F"),
                ("COPPER", "HG=F"),
                ("NATGAS", "NG=F"),
            ]),
            rates: table(&[
                ("US2Y", "2YY=F"),
                ("US5Y", "^FVX"),
                ("US10Y", "^TNX"),
                ("US30Y", "^TYX"),
            ]),
            corporates: table(&[
                ("IG_CORPS", "LQD"),
                ("HY_CORPS", "HYG"),
                ("EM_BONDS", "EMB"),
                ("TIPS", "TIP"),
            ]),
            bond_volatility: "^MOVE".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub database: Database,
    pub schedule: Schedule,
    pub http: Http,
    pub endpoints: Endpoints,
    pub fed: Fed,
    pub newsletter: Newsletter,
    #[serde(default)]
    pub api_keys: ApiKeys,
    #[serde(default)]
    pub analysis: ThresholdConfig,
    #[serde(default)]
    pub symbols: Symbols,
    #[serde(default = "default_release_series")]
    pub releases: Vec<ReleaseSeries>,
    pub log_level: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("config")
    }

    /// Defaults, then `name` (any extension the config crate knows, optional),
    /// then `MONITOR__SECTION__KEY` variables.
    pub fn from_file(name: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("database.url", "sqlite:data/market_monitor.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.retention_days", 90)?
            .set_default("schedule.tick_seconds", 60)?
            .set_default("schedule.error_backoff_seconds", 60)?
            .set_default("schedule.market_data_seconds", 300)?
            .set_default("schedule.economic_data_seconds", 3600)?
            .set_default("schedule.fed_speeches_seconds", 3600)?
            .set_default("schedule.cleanup_seconds", 86400)?
            .set_default("http.timeout_seconds", 30)?
            .set_default("http.user_agent", "Mozilla/5.0 (compatible; market-monitor/0.1)")?
            .set_default(
                "endpoints.yahoo_chart",
                "https://query1.finance.yahoo.com/v8/finance/chart",
            )?
            .set_default(
                "endpoints.fred",
                "https://api.stlouisfed.org/fred/series/observations",
            )?
            .set_default(
                "endpoints.bls",
                "https://api.bls.gov/publicAPI/v2/timeseries/data/",
            )?
            .set_default("fed.recency_days", 7)?
            .set_default("newsletter.enabled", true)?
            .set_default("newsletter.outbox_dir", "data/outbox")?
            .set_default("newsletter.send_hour", 13)?
            .set_default("newsletter.send_minute", 0)?
            .set_default("log_level", "info")?
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("MONITOR").separator("__"))
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;

        // Conventional key variables win when the layered config has none.
        if settings.api_keys.fred.is_none() {
            settings.api_keys.fred = std::env::var("FRED_API_KEY").ok().filter(|k| !k.is_empty());
        }
        if settings.api_keys.bls.is_none() {
            settings.api_keys.bls = std::env::var("BLS_API_KEY").ok().filter(|k| !k.is_empty());
        }

        Ok(settings)
    }

    pub fn get_db_url(&self) -> String {
        self.database.url.clone()
    }
}

fn default_fed_feeds() -> Vec<FedFeed> {
    [
        ("speeches", "https://www.federalreserve.gov/feeds/speeches.xml"),
        ("testimony", "https://www.federalreserve.gov/feeds/testimony.xml"),
        ("press_monetary", "https://www.federalreserve.gov/feeds/press_monetary.xml"),
    ]
    .into_iter()
    .map(|(name, url)| FedFeed {
        name: name.to_string(),
        url: url.to_string(),
    })
    .collect()
}

fn default_release_series() -> Vec<ReleaseSeries> {
    let series = |indicator: &str, name: &str, source, series_id: &str, importance| ReleaseSeries {
        indicator: indicator.to_string(),
        name: name.to_string(),
        source,
        series_id: series_id.to_string(),
        importance,
    };

    vec![
        series("NFP", "Nonfarm Payrolls", DataSource::Bls, "CES0000000001", Importance::High),
        series("UNRATE", "Unemployment Rate", DataSource::Fred, "UNRATE", Importance::High),
        series("CPI", "Consumer Price Index", DataSource::Fred, "CPIAUCSL", Importance::High),
        series("PCE", "PCE Price Index", DataSource::Fred, "PCEPI", Importance::Medium),
        series("GDP", "Real GDP", DataSource::Fred, "GDPC1", Importance::Medium),
    ]
}
