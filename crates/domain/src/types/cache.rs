//! Cache record written by the read-through cache.

use serde::{Deserialize, Serialize};

use super::sync::Priority;
use crate::impl_domain_label_conversions;

/// Where a cached value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Optimistic local update, not yet confirmed by the remote
    Cache,
    /// Confirmed network read
    Network,
}

impl_domain_label_conversions!(CacheSource {
    Cache => "cache",
    Network => "network",
});

/// Cached value plus provenance. Replaced wholesale, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    pub write_timestamp: i64,
    pub source: CacheSource,
    pub priority: Priority,
    pub retry_count: u32,
}

impl<T> CacheEntry<T> {
    pub fn from_network(data: T, write_timestamp: i64, priority: Priority) -> Self {
        Self { data, write_timestamp, source: CacheSource::Network, priority, retry_count: 0 }
    }

    pub fn optimistic(data: T, write_timestamp: i64, priority: Priority) -> Self {
        Self { data, write_timestamp, source: CacheSource::Cache, priority, retry_count: 0 }
    }

    pub fn is_optimistic(&self) -> bool {
        self.source == CacheSource::Cache
    }
}
