use docket_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use docket_common::{impl_error_classification, impl_error_conversion};
use docket_domain::DocketError;
use thiserror::Error;

use crate::storage::StoreError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Every attempt failed and nothing usable was cached
    #[error("fetch for '{key}' failed after {attempts} attempt(s): {message}")]
    FetchFailed { key: String, attempts: u32, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_conversion!(CacheError, Common);

impl_error_classification!(CacheError, Common,
    Self::FetchFailed { .. } => {
        retryable: true,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::Store(e) => {
        retryable: ErrorClassification::is_retryable(e),
        severity: ErrorClassification::severity(e),
        critical: ErrorClassification::is_critical(e),
    }
);

impl From<CacheError> for DocketError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::FetchFailed { .. } => Self::Fetch(err.to_string()),
            CacheError::Store(e) => e.into(),
            CacheError::Common(e) => Self::Internal(e.to_string()),
        }
    }
}
