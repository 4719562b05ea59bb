// collectors/errors.rs

use thiserror::Error;

/// Error types for data collection
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {status} from {source_name}")]
    HttpStatus { source_name: String, status: u16 },

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),

    #[error("Data validation failed")]
    ValidationFailed,
}

// Convert from common error types
impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        CollectorError::ParseError(err.to_string())
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CollectorError::HttpStatus {
                source_name: err
                    .url()
                    .and_then(|u| u.host_str())
                    .unwrap_or("unknown")
                    .to_string(),
                status: status.as_u16(),
            },
            None => CollectorError::NetworkError(err.to_string()),
        }
    }
}
