pub mod repository;
pub mod types;

pub use repository::Repository;
pub use types::{
    Alert, AnalysisRecord, AssetClass, BondMetrics, BondSnapshot, CommunicationType,
    CreditSpreads, DataError, DataResult, DataSource, EconomicRelease, FedCommunication,
    Importance, MarketBreadthData, MarketSnapshot, OptionsActivity, PricePoint, RegimeRecord,
};
