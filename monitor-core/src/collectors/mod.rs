// collectors/mod.rs
// Data collectors for market, bond, economic and Fed sources

pub mod bond;
pub mod economic;
pub mod errors;
pub mod fed_speech;
pub mod market;
pub mod traits;
pub mod utils;
pub mod yahoo;

pub use bond::{BondCollector, CurveShape};
pub use economic::{BlsClient, EconomicDataCollector, FredClient};
pub use errors::CollectorError;
pub use fed_speech::FedSpeechCollector;
pub use market::MarketDataCollector;
pub use traits::{CollectionRunner, Collector, CollectorResponse, CollectorStatus};
pub use yahoo::YahooClient;
