//! Logging initialization
//!
//! Installs a global `tracing` subscriber built from [`LoggingConfig`]:
//! - `RUST_LOG` wins when set; otherwise the configured level applies
//! - `json = true` emits one JSON object per event, otherwise pretty text
//!
//! Initialization is process-wide and happens at most once. Later calls
//! leave the installed subscriber untouched.

use docket_domain::{DocketError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Returns `Ok(true)` when this call installed it and `Ok(false)` when a
/// subscriber was already present.
///
/// # Errors
/// Returns `DocketError::Config` if the configured level is not a valid
/// filter directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = env_filter(config)?;

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
    };

    Ok(installed.is_ok())
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| DocketError::Config(format!("logging.level: {e}")))
}

#[cfg(test)]
mod tests {
    //! Unit tests for logging initialization.

    use super::*;

    /// Validates that a malformed level is reported as a configuration
    /// error.
    ///
    /// Assertions:
    /// - `env_filter` rejects an unparsable directive when `RUST_LOG` is
    ///   unset
    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig { level: "docket=loud".to_string(), json: false };
        assert!(matches!(env_filter(&config), Err(DocketError::Config(_))));
    }

    /// Validates that initialization is idempotent.
    ///
    /// Assertions:
    /// - The second call reports that a subscriber was already installed
    #[test]
    fn test_second_init_is_noop() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config).unwrap();
        assert!(!init_tracing(&config).unwrap());
    }
}
