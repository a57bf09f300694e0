//! Try-primary-else-secondary composition of two stores.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use tracing::{debug, error, warn};

use super::errors::{StoreError, StoreResult};
use super::ports::{RawEntry, Store};

/// Serves each call from `primary`, and from `secondary` whenever the primary
/// errors. Fallbacks are logged and counted, never raised; only a failure of
/// both backends reaches the caller.
///
/// A key written to the secondary during a primary outage stays pinned to
/// the secondary until the next successful primary write. The first read of
/// a key in this process also compares both copies, so a newer secondary
/// record left behind by an earlier run is not shadowed by the primary.
pub struct FallbackStore {
    primary: Arc<dyn Store>,
    secondary: Arc<dyn Store>,
    fallbacks: AtomicU64,
    /// Keys whose latest record lives only in the secondary.
    pinned: DashSet<String>,
    /// Keys already compared across both backends.
    reconciled: DashSet<String>,
}

impl FallbackStore {
    pub fn new(primary: Arc<dyn Store>, secondary: Arc<dyn Store>) -> Self {
        Self {
            primary,
            secondary,
            fallbacks: AtomicU64::new(0),
            pinned: DashSet::new(),
            reconciled: DashSet::new(),
        }
    }

    /// How many operations were served by the secondary backend.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    fn note_fallback(&self, operation: &'static str, key: &str, cause: &StoreError) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        warn!(
            operation,
            key,
            primary = self.primary.name(),
            fallback = self.secondary.name(),
            error = %cause,
            "Primary storage backend failed; using fallback"
        );
    }

    fn both_failed(&self, key: &str, primary: &StoreError, fallback: &StoreError) -> StoreError {
        error!(key, primary = %primary, fallback = %fallback, "Both storage backends failed");
        StoreError::BothBackendsFailed {
            key: key.to_string(),
            primary: primary.to_string(),
            fallback: fallback.to_string(),
        }
    }

    /// Newer of the primary record and any secondary copy, on first touch.
    async fn reconcile(&self, key: &str, primary: Option<RawEntry>) -> Option<RawEntry> {
        if !self.reconciled.insert(key.to_string()) {
            return primary;
        }
        let secondary = match self.secondary.get(key).await {
            Ok(found) => found,
            Err(e) => {
                debug!(key, error = %e, "Secondary unreadable during reconcile");
                return primary;
            }
        };
        match (primary, secondary) {
            (Some(p), Some(s)) if s.write_timestamp > p.write_timestamp => {
                self.pin(key, "stale primary");
                Some(s)
            }
            (None, Some(s)) => {
                self.pin(key, "missing from primary");
                Some(s)
            }
            (primary, _) => primary,
        }
    }

    fn pin(&self, key: &str, reason: &'static str) {
        if self.pinned.insert(key.to_string()) {
            debug!(key, reason, secondary = self.secondary.name(), "Key pinned to secondary");
        }
    }

    /// Drop the secondary copy once the primary holds the latest state.
    async fn unpin(&self, key: &str) {
        if self.pinned.remove(key).is_none() {
            return;
        }
        if let Err(e) = self.secondary.delete(key).await {
            warn!(key, error = %e, "Could not drop superseded secondary copy");
        }
    }
}

#[async_trait]
impl Store for FallbackStore {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<RawEntry>> {
        if self.pinned.contains(key) {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
            match self.secondary.get(key).await {
                Ok(found) => return Ok(found),
                Err(e) => warn!(key, error = %e, "Pinned secondary read failed; trying primary"),
            }
        }

        match self.primary.get(key).await {
            Ok(found) => Ok(self.reconcile(key, found).await),
            Err(primary_err) => {
                self.reconciled.insert(key.to_string());
                self.note_fallback("get", key, &primary_err);
                self.secondary.get(key).await.map_err(|e| self.both_failed(key, &primary_err, &e))
            }
        }
    }

    async fn put(&self, key: &str, entry: RawEntry) -> StoreResult<()> {
        match self.primary.put(key, entry.clone()).await {
            Ok(()) => {
                self.reconciled.insert(key.to_string());
                self.unpin(key).await;
                Ok(())
            }
            Err(primary_err) => {
                self.note_fallback("put", key, &primary_err);
                self.secondary
                    .put(key, entry)
                    .await
                    .map_err(|e| self.both_failed(key, &primary_err, &e))?;
                self.reconciled.insert(key.to_string());
                self.pin(key, "primary write failed");
                Ok(())
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match self.primary.delete(key).await {
            Ok(()) => {
                self.pinned.remove(key);
                self.reconciled.insert(key.to_string());
                if let Err(e) = self.secondary.delete(key).await {
                    debug!(key, error = %e, "Secondary copy not removed");
                }
                Ok(())
            }
            Err(primary_err) => {
                self.note_fallback("delete", key, &primary_err);
                self.secondary
                    .delete(key)
                    .await
                    .map_err(|e| self.both_failed(key, &primary_err, &e))?;
                // Nothing left in the secondary; the primary copy is stale
                // until it can be deleted too.
                self.pinned.insert(key.to_string());
                self.reconciled.insert(key.to_string());
                Ok(())
            }
        }
    }
}
