use std::time::Duration;

use docket_domain::constants::STORAGE_FORMAT_VERSION;
use docket_domain::{CacheConfig, Priority};

/// Per-resource cache settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    pub key: String,
    /// Freshness window while online.
    pub ttl_online: Duration,
    /// Freshness window while offline; normally much longer.
    pub ttl_offline: Duration,
    /// Re-fetch optimistic entries once online.
    pub sync_on_reconnect: bool,
    pub priority: Priority,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    pub retry_delay_base: Duration,
    /// Upper bound on a single backoff delay.
    pub max_retry_delay: Duration,
    /// Fetch requests closer together than this are skipped.
    pub min_fetch_interval: Duration,
    pub compress: bool,
    pub format_version: u32,
}

impl CacheOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self::from_config(key, &CacheConfig::default())
    }

    pub fn from_config(key: impl Into<String>, config: &CacheConfig) -> Self {
        Self {
            key: key.into(),
            ttl_online: config.ttl_online(),
            ttl_offline: config.ttl_offline(),
            sync_on_reconnect: config.sync_on_reconnect,
            priority: Priority::Medium,
            max_retries: config.max_retries,
            retry_delay_base: config.retry_delay_base(),
            max_retry_delay: config.max_retry_delay(),
            min_fetch_interval: config.min_fetch_interval(),
            compress: true,
            format_version: STORAGE_FORMAT_VERSION,
        }
    }

    pub fn with_ttls(mut self, online: Duration, offline: Duration) -> Self {
        self.ttl_online = online;
        self.ttl_offline = offline;
        self
    }

    pub fn with_sync_on_reconnect(mut self, enabled: bool) -> Self {
        self.sync_on_reconnect = enabled;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_base = base_delay;
        self
    }

    pub fn with_max_retry_delay(mut self, cap: Duration) -> Self {
        self.max_retry_delay = cap;
        self
    }

    pub fn with_min_fetch_interval(mut self, interval: Duration) -> Self {
        self.min_fetch_interval = interval;
        self
    }

    pub fn with_format_version(mut self, version: u32) -> Self {
        self.format_version = version;
        self
    }

    /// TTL in effect for the given connectivity.
    pub fn effective_ttl(&self, is_online: bool) -> Duration {
        if is_online {
            self.ttl_online
        } else {
            self.ttl_offline
        }
    }

    /// Retention on disk: the longest window in which the entry is useful.
    pub fn storage_ttl(&self) -> Duration {
        self.ttl_online.max(self.ttl_offline)
    }
}
