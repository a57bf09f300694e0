//! Shared error vocabulary for the Docket crates.
//!
//! Component errors (`StoreError`, `CacheError`, `QueueError`,
//! `MonitorError`) embed [`CommonError`] through a transparent `Common`
//! variant. The two macros below wire up the `From` conversions and the
//! [`ErrorClassification`] impl so retry decisions never depend on which
//! component raised the failure.
//!
//! ```rust,ignore
//! #[derive(Debug, thiserror::Error)]
//! pub enum MonitorError {
//!     #[error("probe failed: {0}")]
//!     Probe(String),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//!
//! impl_error_conversion!(MonitorError, Common);
//! impl_error_classification!(MonitorError, Common,
//!     Self::Probe(_) => {
//!         retryable: true,
//!         severity: ErrorSeverity::Warning,
//!         critical: false,
//!     }
//! );
//! ```
//!
//! Severity in practice: `Info` for expected outcomes (cache miss, cancelled
//! worker), `Warning` while degraded but still serving, `Error` when the
//! caller sees the failure, `Critical` when both storage backends are gone
//! or an invariant broke.

use std::fmt;
use std::time::Duration;

pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommonError {
    #[error("config `{field}`: {message}")]
    Config { field: String, message: String },

    /// JSON, TOML, base64 or a compressed payload failed to decode.
    #[error("{format} codec: {message}")]
    Serialization { format: String, message: String },

    #[error("io: {message}")]
    Persistence { message: String },

    #[error("storage `{operation}`: {message}")]
    Storage { operation: String, message: String },

    #[error("`{operation}` timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    #[error("{service} unavailable: {message}")]
    Backend { service: String, message: String, is_retryable: bool },

    #[error("invalid `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("worker `{task}` cancelled")]
    TaskCancelled { task: String },

    #[error("internal ({context}): {message}")]
    Internal { context: String, message: String },
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Storage { .. } | Self::Timeout { .. } => true,
            Self::Backend { is_retryable, .. } => *is_retryable,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TaskCancelled { .. } => ErrorSeverity::Info,
            Self::Storage { .. } | Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Internal { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl CommonError {
    pub fn config_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { field: field.into(), message: message.into() }
    }

    pub fn serialization_format(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization { format: format.into(), message: message.into() }
    }

    pub fn storage_op(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage { operation: operation.into(), message: message.into() }
    }

    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    pub fn backend(
        service: impl Into<String>,
        message: impl Into<String>,
        is_retryable: bool,
    ) -> Self {
        Self::Backend { service: service.into(), message: message.into(), is_retryable }
    }

    pub fn internal(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Internal { context: context.into(), message: message.into() }
    }
}

/// How a caller should react to a failure.
pub trait ErrorClassification {
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    /// True when data integrity is in question, not just availability.
    fn is_critical(&self) -> bool;

    /// Delay hint from the failing source, if it gave one.
    fn retry_after(&self) -> Option<Duration>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_format("json", err.to_string())
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization_format("toml", err.to_string())
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence { message: err.to_string() }
    }
}

/// Adds `From<serde_json::Error>` and `From<std::io::Error>` to a component
/// error whose `$variant` wraps [`CommonError`].
///
/// The `with_common` form also generates `From<CommonError>` for enums that
/// do not use `#[from]` on that variant.
#[macro_export]
macro_rules! impl_error_conversion {
    ($error_type:ty, $variant:ident) => {
        impl From<serde_json::Error> for $error_type {
            fn from(err: serde_json::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }

        impl From<std::io::Error> for $error_type {
            fn from(err: std::io::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }
    };

    ($error_type:ty, $variant:ident, with_common) => {
        impl From<$crate::error::CommonError> for $error_type {
            fn from(err: $crate::error::CommonError) -> Self {
                Self::$variant(err)
            }
        }

        $crate::impl_error_conversion!($error_type, $variant);
    };
}

/// Implements [`ErrorClassification`] for a component error. The
/// `$common_variant` arm delegates to [`CommonError`]; every other variant is
/// listed with its classification.
#[macro_export]
macro_rules! impl_error_classification {
    (
        $error_type:ty,
        $common_variant:ident
        $(,
            $variant:pat => {
                retryable: $retryable:expr,
                severity: $severity:expr,
                critical: $critical:expr
                $(, retry_after: $retry_after:expr)?
                $(,)?
            }
        )*
        $(,)?
    ) => {
        impl $crate::error::ErrorClassification for $error_type {
            fn is_retryable(&self) -> bool {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::is_retryable(e),
                    $( $variant => $retryable, )*
                }
            }

            fn severity(&self) -> $crate::error::ErrorSeverity {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::severity(e),
                    $( $variant => $severity, )*
                }
            }

            fn is_critical(&self) -> bool {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::is_critical(e),
                    $( $variant => $critical, )*
                }
            }

            fn retry_after(&self) -> Option<std::time::Duration> {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::retry_after(e),
                    $( $( $variant => $retry_after, )? )*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }
    };
}
