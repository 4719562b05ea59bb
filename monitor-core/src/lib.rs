// monitor-core/src/lib.rs
// Market Monitor - collectors, configuration, notification and the monitoring service

pub mod collectors;
pub mod config;
pub mod notifier;
pub mod service;

// Re-export monitor-common for convenience
pub use monitor_common::{analysis, data};
