// service/errors.rs

use crate::collectors::CollectorError;
use crate::notifier::NotifyError;
use monitor_common::data::DataError;
use thiserror::Error;

/// Service layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Task error: {0}")]
    Task(String),
}
