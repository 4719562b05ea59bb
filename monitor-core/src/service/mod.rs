// service/mod.rs

pub mod errors;
pub mod monitor;
pub mod schedule;

pub use errors::ServiceError;
pub use monitor::{CycleReport, MonitorService};
pub use schedule::{Cadence, CycleSchedule, DailyGate};
