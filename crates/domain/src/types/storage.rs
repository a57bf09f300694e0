//! Persisted record envelope.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Envelope written for every stored key.
///
/// `data` is either the serialized value or, when `is_compressed` is set, the
/// armoured compressed form of it. The flag is recorded per entry so reads
/// decode correctly even if compression settings change later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEntry<D> {
    pub data: D,
    /// Milliseconds since the Unix epoch.
    pub write_timestamp: i64,
    #[serde(rename = "ttl", default)]
    pub ttl_ms: Option<u64>,
    pub format_version: u32,
    #[serde(default)]
    pub is_compressed: bool,
}

impl<D> StorageEntry<D> {
    pub fn new(data: D, write_timestamp: i64, ttl: Option<Duration>, format_version: u32) -> Self {
        Self {
            data,
            write_timestamp,
            ttl_ms: ttl.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            format_version,
            is_compressed: false,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }

    /// `write_timestamp + ttl < now`. Entries without a TTL never expire.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.ttl_ms.is_some_and(|ttl| {
            let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
            self.write_timestamp.saturating_add(ttl) < now_millis
        })
    }

    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.write_timestamp)
    }

    pub fn map<U>(self, f: impl FnOnce(D) -> U) -> StorageEntry<U> {
        StorageEntry {
            data: f(self.data),
            write_timestamp: self.write_timestamp,
            ttl_ms: self.ttl_ms,
            format_version: self.format_version,
            is_compressed: self.is_compressed,
        }
    }
}
