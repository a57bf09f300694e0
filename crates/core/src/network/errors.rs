use docket_common::error::{CommonError, ErrorSeverity};
use docket_common::{impl_error_classification, impl_error_conversion};
use docket_domain::DocketError;
use thiserror::Error;

/// Errors from the network monitor lifecycle
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("network monitor already running")]
    AlreadyRunning,

    #[error("network monitor not running")]
    NotRunning,

    #[error("network monitor task failed to join: {0}")]
    TaskJoin(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_conversion!(MonitorError, Common);

impl_error_classification!(MonitorError, Common,
    Self::AlreadyRunning | Self::NotRunning => {
        retryable: false,
        severity: ErrorSeverity::Info,
        critical: false,
    },
    Self::TaskJoin(_) => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    }
);

impl From<MonitorError> for DocketError {
    fn from(err: MonitorError) -> Self {
        Self::Network(err.to_string())
    }
}
