//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::{DocketError, Result};
use crate::impl_domain_label_conversions;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub sync: SyncConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

/// Storage backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database for the transactional backend. `None` runs on the
    /// simple file backend alone.
    pub sqlite_path: Option<String>,
    /// Directory for the simple key/value fallback backend.
    pub fallback_dir: String,
    pub pool_size: u32,
    pub compression_threshold_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: Some("docket.db".to_string()),
            fallback_dir: "docket-kv".to_string(),
            pool_size: 4,
            compression_threshold_bytes: DEFAULT_COMPRESSION_THRESHOLD_BYTES,
        }
    }
}

/// Defaults applied to every read-through cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_online_secs: u64,
    pub ttl_offline_secs: u64,
    pub max_retries: u32,
    pub retry_delay_base_ms: u64,
    pub max_retry_delay_ms: u64,
    pub min_fetch_interval_ms: u64,
    pub sync_on_reconnect: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_online_secs: DEFAULT_CACHE_TTL_ONLINE_SECS,
            ttl_offline_secs: DEFAULT_CACHE_TTL_OFFLINE_SECS,
            max_retries: DEFAULT_FETCH_MAX_RETRIES,
            retry_delay_base_ms: DEFAULT_RETRY_DELAY_BASE_MS,
            max_retry_delay_ms: DEFAULT_MAX_RETRY_DELAY_MS,
            min_fetch_interval_ms: DEFAULT_MIN_FETCH_INTERVAL_MS,
            sync_on_reconnect: true,
        }
    }
}

impl CacheConfig {
    pub fn ttl_online(&self) -> Duration {
        Duration::from_secs(self.ttl_online_secs)
    }

    pub fn ttl_offline(&self) -> Duration {
        Duration::from_secs(self.ttl_offline_secs)
    }

    pub fn retry_delay_base(&self) -> Duration {
        Duration::from_millis(self.retry_delay_base_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub fn min_fetch_interval(&self) -> Duration {
        Duration::from_millis(self.min_fetch_interval_ms)
    }
}

/// What the queue does when an insert would exceed `max_queue_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the oldest queued operations to make room
    #[default]
    EvictOldest,
    /// Refuse the new operation
    Reject,
}

impl_domain_label_conversions!(OverflowPolicy {
    EvictOldest => "evict_oldest",
    Reject => "reject",
});

/// Sync queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub max_queue_size: usize,
    pub batch_size: usize,
    /// Informational; retries are paced by the periodic sync timer.
    pub retry_delay_ms: u64,
    pub sync_interval_secs: u64,
    pub inter_batch_delay_ms: u64,
    pub default_max_retries: u32,
    pub overflow_policy: OverflowPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            batch_size: DEFAULT_SYNC_BATCH_SIZE,
            retry_delay_ms: DEFAULT_SYNC_RETRY_DELAY_MS,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            inter_batch_delay_ms: DEFAULT_INTER_BATCH_DELAY_MS,
            default_max_retries: DEFAULT_OPERATION_MAX_RETRIES,
            overflow_policy: OverflowPolicy::EvictOldest,
        }
    }
}

impl SyncConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }
}

/// Connectivity probing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Health endpoint polled for reachability. `None` leaves connectivity to
    /// events pushed by the embedding application.
    pub health_url: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_ms: u64,
    pub slow_downlink_mbps: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            health_url: None,
            poll_interval_secs: DEFAULT_PROBE_POLL_INTERVAL_SECS,
            request_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            slow_downlink_mbps: SLOW_DOWNLINK_MBPS,
        }
    }
}

impl NetworkConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

fn invalid(field: &str, message: &str) -> DocketError {
    DocketError::Config(format!("{field}: {message}"))
}

impl Config {
    /// Reject settings the components cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.storage.fallback_dir.trim().is_empty() {
            return Err(invalid("storage.fallback_dir", "must not be empty"));
        }
        if self.storage.pool_size == 0 {
            return Err(invalid("storage.pool_size", "must be greater than zero"));
        }
        if self.cache.ttl_online_secs == 0 || self.cache.ttl_offline_secs == 0 {
            return Err(invalid("cache.ttl", "online and offline TTLs must be greater than zero"));
        }
        if self.cache.retry_delay_base_ms > self.cache.max_retry_delay_ms {
            return Err(invalid("cache.retry_delay_base_ms", "must not exceed max_retry_delay_ms"));
        }
        if self.sync.max_queue_size == 0 {
            return Err(invalid("sync.max_queue_size", "must be greater than zero"));
        }
        if self.sync.batch_size == 0 {
            return Err(invalid("sync.batch_size", "must be greater than zero"));
        }
        if self.sync.batch_size > self.sync.max_queue_size {
            return Err(invalid("sync.batch_size", "must not exceed max_queue_size"));
        }
        if self.sync.sync_interval_secs == 0 {
            return Err(invalid("sync.sync_interval_secs", "must be greater than zero"));
        }
        if self.network.poll_interval_secs == 0 {
            return Err(invalid("network.poll_interval_secs", "must be greater than zero"));
        }
        if !(self.network.slow_downlink_mbps.is_finite() && self.network.slow_downlink_mbps >= 0.0) {
            return Err(invalid("network.slow_downlink_mbps", "must be a non-negative number"));
        }
        Ok(())
    }
}
