use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a classifier could not produce a label.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Degraded {
    #[error("missing data: {0}")]
    MissingData(String),

    #[error("insufficient history: need {needed} points, have {available}")]
    InsufficientHistory { needed: usize, available: usize },

    #[error("computation failed: {0}")]
    Computation(String),
}

pub type Assessment<T> = Result<T, Degraded>;

/// A degraded component as recorded on a regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub component: String,
    pub reason: Degraded,
}

impl Degraded {
    pub fn missing(field: impl Into<String>) -> Self {
        Degraded::MissingData(field.into())
    }

    /// `Ok(())` when `available` reaches `needed`.
    pub fn require(needed: usize, available: usize) -> Assessment<()> {
        if available < needed {
            Err(Degraded::InsufficientHistory { needed, available })
        } else {
            Ok(())
        }
    }
}
