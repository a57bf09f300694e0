use docket_common::error::{CommonError, ErrorSeverity};
use docket_common::{impl_error_classification, impl_error_conversion};
use docket_domain::DocketError;
use thiserror::Error;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{backend} backend failed: {message}")]
    Backend { backend: String, message: String },

    #[error("both storage backends failed for '{key}' (primary: {primary}; fallback: {fallback})")]
    BothBackendsFailed { key: String, primary: String, fallback: String },

    #[error("undecodable entry for '{key}': {message}")]
    Codec { key: String, message: String },

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl StoreError {
    pub fn backend(backend: impl Into<String>, message: impl ToString) -> Self {
        Self::Backend { backend: backend.into(), message: message.to_string() }
    }
}

impl_error_conversion!(StoreError, Common);

impl_error_classification!(StoreError, Common,
    Self::Backend { .. } => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::BothBackendsFailed { .. } => {
        retryable: false,
        severity: ErrorSeverity::Critical,
        critical: true,
    },
    Self::Codec { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    }
);

impl From<StoreError> for DocketError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Codec { .. } | StoreError::Common(CommonError::Serialization { .. }) => {
                Self::Serialization(err.to_string())
            }
            other => Self::Storage(other.to_string()),
        }
    }
}
