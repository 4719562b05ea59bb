// collectors/traits.rs
// ====
// Collector abstraction and the collection template around it
// ====

use super::CollectorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use tracing::{error, warn};

/// Errors kept per collector for status reporting.
const RECENT_ERRORS: usize = 5;

/// Data source polled by the monitor.
#[async_trait]
pub trait Collector: Send + Sync {
    type Output: Send;

    fn name(&self) -> &str;

    async fn collect(&self) -> Result<Self::Output, CollectorError>;

    fn validate(&self, data: &Self::Output) -> bool;
}

/// Outcome of one collection attempt.
#[derive(Debug, Clone)]
pub struct CollectorResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

impl<T> CollectorResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn into_data(self) -> Option<T> {
        if self.success {
            self.data
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionError {
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectorStatus {
    pub last_collection: Option<DateTime<Utc>>,
    pub recent_errors: Vec<CollectionError>,
    pub total_errors: usize,
}

/// Wraps a collector with attempt tracking and validation.
pub struct CollectionRunner<O> {
    collector: Box<dyn Collector<Output = O>>,
    last_collection: Option<DateTime<Utc>>,
    errors: VecDeque<CollectionError>,
    total_errors: usize,
}

impl<O: Send> CollectionRunner<O> {
    pub fn new(collector: Box<dyn Collector<Output = O>>) -> Self {
        Self {
            collector,
            last_collection: None,
            errors: VecDeque::with_capacity(RECENT_ERRORS),
            total_errors: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.collector.name()
    }

    /// Runs one collection; never returns an error, failures land in the response.
    pub async fn execute_collection(&mut self) -> CollectorResponse<O> {
        self.last_collection = Some(Utc::now());

        match self.collector.collect().await {
            Ok(data) if self.collector.validate(&data) => {
                CollectorResponse::ok(data).with_meta("collector", self.collector.name())
            }
            Ok(_) => {
                warn!("{}: {}", self.collector.name(), CollectorError::ValidationFailed);
                self.note_error(CollectorError::ValidationFailed.to_string());
                CollectorResponse::failed(CollectorError::ValidationFailed.to_string())
                    .with_meta("collector", self.collector.name())
            }
            Err(e) => {
                let message = format!("Collection failed: {}", e);
                error!("{}: {}", self.collector.name(), message);
                self.note_error(message.clone());
                CollectorResponse::failed(message).with_meta("collector", self.collector.name())
            }
        }
    }

    pub fn status(&self) -> CollectorStatus {
        CollectorStatus {
            last_collection: self.last_collection,
            recent_errors: self.errors.iter().cloned().collect(),
            total_errors: self.total_errors,
        }
    }

    fn note_error(&mut self, error: String) {
        if self.errors.len() == RECENT_ERRORS {
            self.errors.pop_front();
        }
        self.errors.push_back(CollectionError {
            timestamp: Utc::now(),
            error,
        });
        self.total_errors += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Collector for Flaky {
        type Output = u32;

        fn name(&self) -> &str {
            "flaky"
        }

        async fn collect(&self) -> Result<u32, CollectorError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) % 3 {
                0 => Ok(7),
                1 => Ok(0),
                _ => Err(CollectorError::NetworkError("connection reset".into())),
            }
        }

        fn validate(&self, data: &u32) -> bool {
            *data > 0
        }
    }

    #[tokio::test]
    async fn test_runner_tracks_failures() {
        let mut runner = CollectionRunner::<u32>::new(Box::new(Flaky {
            calls: AtomicUsize::new(0),
        }));

        let ok = runner.execute_collection().await;
        assert!(ok.success);
        assert_eq!(ok.data, Some(7));
        assert_eq!(ok.metadata.get("collector").map(String::as_str), Some("flaky"));

        let invalid = runner.execute_collection().await;
        assert!(!invalid.success);
        assert_eq!(invalid.error.as_deref(), Some("Data validation failed"));

        let failed = runner.execute_collection().await;
        assert!(failed.into_data().is_none());

        let status = runner.status();
        assert!(status.last_collection.is_some());
        assert_eq!(status.total_errors, 2);
        assert!(status.recent_errors[1].error.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_recent_errors_are_bounded() {
        let mut runner = CollectionRunner::<u32>::new(Box::new(Flaky {
            calls: AtomicUsize::new(1),
        }));
        for _ in 0..12 {
            runner.execute_collection().await;
        }
        let status = runner.status();
        assert_eq!(status.total_errors, 8);
        assert_eq!(status.recent_errors.len(), RECENT_ERRORS);
    }
}
