use docket_common::error::{CommonError, ErrorSeverity};
use docket_common::{impl_error_classification, impl_error_conversion};
use docket_domain::DocketError;
use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Sync queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Raised only under the `reject` overflow policy
    #[error("sync queue is at maximum capacity ({0})")]
    CapacityExceeded(usize),

    #[error("invalid sync queue configuration: {0}")]
    InvalidConfig(String),

    #[error("sync worker already running")]
    WorkerAlreadyRunning,

    #[error("sync worker not running")]
    WorkerNotRunning,

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_conversion!(QueueError, Common);

impl_error_classification!(QueueError, Common,
    Self::CapacityExceeded(_) => {
        retryable: true,  // space frees up after the next sync
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::InvalidConfig(_) => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::WorkerAlreadyRunning | Self::WorkerNotRunning => {
        retryable: false,
        severity: ErrorSeverity::Info,
        critical: false,
    }
);

impl From<QueueError> for DocketError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::InvalidConfig(msg) => Self::Config(msg),
            QueueError::Common(e) => Self::Internal(e.to_string()),
            other => Self::Sync(other.to_string()),
        }
    }
}
