//! Error types surfaced to applications embedding the offline core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Docket
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DocketError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for DocketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for Docket operations
pub type Result<T> = std::result::Result<T, DocketError>;
