//! Typed, versioned, TTL-aware value storage.
//!
//! Reads fail closed: a record written under another format version, past
//! its TTL, or that no longer decodes is reported as absent and purged, so
//! stale or incompatible data never leaks into the caller.

use std::sync::Arc;
use std::time::Duration;

use docket_common::codec::CompressionService;
use docket_common::time::{Clock, SystemClock};
use docket_domain::constants::{DEFAULT_COMPRESSION_THRESHOLD_BYTES, STORAGE_FORMAT_VERSION};
use docket_domain::StorageEntry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::errors::{StoreError, StoreResult};
use super::ports::{RawEntry, Store};

/// Per-key storage settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    pub key: String,
    pub ttl: Option<Duration>,
    pub compress: bool,
    pub format_version: u32,
    /// Serialized payloads longer than this many bytes are compressed when
    /// `compress` is set.
    pub compression_threshold: usize,
}

impl StoreOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl: None,
            compress: false,
            format_version: STORAGE_FORMAT_VERSION,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD_BYTES,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_format_version(mut self, version: u32) -> Self {
        self.format_version = version;
        self
    }

    pub fn with_compression_threshold(mut self, bytes: usize) -> Self {
        self.compression_threshold = bytes;
        self
    }
}

/// A single typed value persisted under one key.
pub struct PersistentStore<T> {
    store: Arc<dyn Store>,
    options: StoreOptions,
    default_value: T,
    codec: CompressionService,
    clock: Arc<dyn Clock>,
}

impl<T> PersistentStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(store: Arc<dyn Store>, options: StoreOptions, default_value: T) -> Self {
        Self {
            store,
            options,
            default_value,
            codec: CompressionService::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn key(&self) -> &str {
        &self.options.key
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// The stored value, or the default when absent, expired, from another
    /// format version, or undecodable. Invalid records are purged.
    pub async fn load(&self) -> T {
        match self.load_entry().await {
            Some(entry) => entry.data,
            None => self.default_value.clone(),
        }
    }

    /// Like [`load`](Self::load) but keeps the envelope metadata.
    #[instrument(skip(self), fields(key = %self.options.key))]
    pub async fn load_entry(&self) -> Option<StorageEntry<T>> {
        let raw = match self.store.get(&self.options.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Storage read failed; using default value");
                return None;
            }
        };

        if raw.format_version != self.options.format_version {
            warn!(
                stored = raw.format_version,
                expected = self.options.format_version,
                "Format version mismatch; purging entry"
            );
            self.purge().await;
            return None;
        }

        if raw.is_expired(self.clock.now_millis()) {
            debug!(written_at = raw.write_timestamp, "Entry expired; purging");
            self.purge().await;
            return None;
        }

        match self.decode(&raw) {
            Ok(value) => Some(raw.map(|_| value)),
            Err(e) => {
                warn!(error = %e, "Entry failed to decode; purging");
                self.purge().await;
                None
            }
        }
    }

    /// Persist `value`, compressing large payloads when configured.
    #[instrument(skip(self, value), fields(key = %self.options.key))]
    pub async fn save(&self, value: &T) -> StoreResult<()> {
        let raw = self.encode(value)?;
        debug!(bytes = raw.data.len(), compressed = raw.is_compressed, "Saving entry");
        self.store.put(&self.options.key, raw).await
    }

    #[instrument(skip(self), fields(key = %self.options.key))]
    pub async fn remove(&self) -> StoreResult<()> {
        self.store.delete(&self.options.key).await
    }

    fn encode(&self, value: &T) -> StoreResult<RawEntry> {
        let json = serde_json::to_string(value)?;
        let mut entry = StorageEntry::new(
            json,
            self.clock.now_millis(),
            self.options.ttl,
            self.options.format_version,
        );
        if self.options.compress && entry.data.len() > self.options.compression_threshold {
            entry.data = self.codec.encode_text(&entry.data)?;
            entry.is_compressed = true;
        }
        Ok(entry)
    }

    fn decode(&self, raw: &RawEntry) -> StoreResult<T> {
        let codec_error =
            |message: String| StoreError::Codec { key: self.options.key.clone(), message };

        if raw.is_compressed {
            let json = self.codec.decode_text(&raw.data).map_err(|e| codec_error(e.to_string()))?;
            serde_json::from_str(&json).map_err(|e| codec_error(e.to_string()))
        } else {
            serde_json::from_str(&raw.data).map_err(|e| codec_error(e.to_string()))
        }
    }

    async fn purge(&self) {
        if let Err(e) = self.store.delete(&self.options.key).await {
            warn!(key = %self.options.key, error = %e, "Failed to purge invalid entry");
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for storage::persistent.
    use docket_common::time::MockClock;
    use serde::Deserialize;

    use super::*;
    use crate::storage::{MemoryKv, SimpleKvStore, StringKv};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Draft {
        client: String,
        hours: Vec<f32>,
    }

    fn draft() -> Draft {
        Draft { client: "Okafor LLP".into(), hours: vec![1.5, 0.25] }
    }

    fn backend() -> (Arc<MemoryKv>, Arc<dyn Store>) {
        let kv = Arc::new(MemoryKv::new());
        let store: Arc<dyn Store> = Arc::new(SimpleKvStore::new(Arc::clone(&kv)));
        (kv, store)
    }

    /// Validates save then load returns the same value.
    ///
    /// Assertions:
    /// - Confirms the loaded value equals the saved value.
    #[tokio::test]
    async fn test_roundtrip() {
        let (_, store) = backend();
        let persistent = PersistentStore::new(store, StoreOptions::new("draft"), None::<Draft>);

        persistent.save(&Some(draft())).await.unwrap();
        assert_eq!(persistent.load().await, Some(draft()));
    }

    /// Validates a missing key yields the default without touching storage.
    ///
    /// Assertions:
    /// - Confirms `load()` returns the configured default.
    #[tokio::test]
    async fn test_missing_returns_default() {
        let (kv, store) = backend();
        let persistent = PersistentStore::new(store, StoreOptions::new("absent"), 42_u32);
        assert_eq!(persistent.load().await, 42);
        assert!(kv.is_empty());
    }

    /// Validates expiry returns the default and purges the record.
    ///
    /// Assertions:
    /// - Confirms the value loads before the TTL elapses.
    /// - Confirms the default loads after it elapses.
    /// - Ensures the raw record is gone from the backend.
    #[tokio::test]
    async fn test_expired_entry_purged() {
        let (kv, store) = backend();
        let clock = MockClock::at_millis(1_000_000);
        let persistent = PersistentStore::new(
            store,
            StoreOptions::new("ttl").with_ttl(Duration::from_secs(60)),
            Vec::<u32>::new(),
        )
        .with_clock(Arc::new(clock.clone()));

        persistent.save(&vec![1, 2, 3]).await.unwrap();
        clock.advance(Duration::from_secs(60));
        assert_eq!(persistent.load().await, vec![1, 2, 3]);

        clock.advance(Duration::from_millis(1));
        assert!(persistent.load().await.is_empty());
        assert!(!kv.contains("ttl"));
    }

    /// Validates a version bump invalidates older records.
    ///
    /// Assertions:
    /// - Confirms a v2 reader gets the default for a v1 record.
    /// - Ensures the v1 record is purged.
    #[tokio::test]
    async fn test_version_mismatch_purged() {
        let (kv, store) = backend();
        let v1 = PersistentStore::new(
            Arc::clone(&store),
            StoreOptions::new("versioned").with_format_version(1),
            String::new(),
        );
        v1.save(&"old shape".to_string()).await.unwrap();

        let v2 = PersistentStore::new(
            store,
            StoreOptions::new("versioned").with_format_version(2),
            "fresh".to_string(),
        );
        assert_eq!(v2.load().await, "fresh");
        assert!(!kv.contains("versioned"));
    }

    /// Validates large payloads are compressed and still round-trip.
    ///
    /// Assertions:
    /// - Ensures the stored record is flagged compressed.
    /// - Confirms the stored payload is smaller than the plain JSON.
    /// - Confirms the value loads back intact.
    #[tokio::test]
    async fn test_large_payload_compressed() {
        let (kv, store) = backend();
        let persistent = PersistentStore::new(
            Arc::clone(&store),
            StoreOptions::new("bulk").with_compression(true).with_compression_threshold(256),
            Vec::<Draft>::new(),
        );
        let value: Vec<Draft> = (0..200).map(|_| draft()).collect();
        let plain_len = serde_json::to_string(&value).unwrap().len();

        persistent.save(&value).await.unwrap();

        let raw = store.get("bulk").await.unwrap().unwrap();
        assert!(raw.is_compressed);
        assert!(raw.data.len() < plain_len);
        assert!(kv.raw("bulk").is_some());
        assert_eq!(persistent.load().await, value);
    }

    /// Validates small payloads stay plain even with compression enabled.
    ///
    /// Assertions:
    /// - Ensures `is_compressed` is false below the threshold.
    #[tokio::test]
    async fn test_small_payload_not_compressed() {
        let (_, store) = backend();
        let persistent = PersistentStore::new(
            Arc::clone(&store),
            StoreOptions::new("small").with_compression(true),
            0_u8,
        );
        persistent.save(&7).await.unwrap();
        assert!(!store.get("small").await.unwrap().unwrap().is_compressed);
    }

    /// Validates the compressed flag is honoured after settings change.
    ///
    /// Assertions:
    /// - Confirms a reader with compression disabled still decodes a
    ///   compressed record.
    #[tokio::test]
    async fn test_compressed_flag_survives_config_change() {
        let (_, store) = backend();
        let writer = PersistentStore::new(
            Arc::clone(&store),
            StoreOptions::new("flag").with_compression(true).with_compression_threshold(8),
            String::new(),
        );
        let text = "retainer agreement ".repeat(20);
        writer.save(&text).await.unwrap();

        let reader = PersistentStore::new(store, StoreOptions::new("flag"), String::new());
        assert_eq!(reader.load().await, text);
    }

    /// Validates undecodable payloads are treated as absent and purged.
    ///
    /// Assertions:
    /// - Confirms the default is returned.
    /// - Ensures the corrupt record is removed.
    #[tokio::test]
    async fn test_corrupt_payload_purged() {
        let (kv, store) = backend();
        let mut corrupt = RawEntry::new("H4sIAAAA-garbage".to_string(), 0, None, STORAGE_FORMAT_VERSION);
        corrupt.is_compressed = true;
        store.put("corrupt", corrupt).await.unwrap();

        let persistent = PersistentStore::new(store, StoreOptions::new("corrupt"), 5_i32);
        assert_eq!(persistent.load().await, 5);
        assert!(kv.get("corrupt").await.unwrap().is_none());
    }

    /// Validates `remove` deletes the record.
    #[tokio::test]
    async fn test_remove() {
        let (kv, store) = backend();
        let persistent = PersistentStore::new(store, StoreOptions::new("gone"), 0_u64);
        persistent.save(&9).await.unwrap();
        persistent.remove().await.unwrap();
        assert!(!kv.contains("gone"));
        assert_eq!(persistent.load().await, 0);
    }
}
