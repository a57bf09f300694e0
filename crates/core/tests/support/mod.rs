//! Shared test helpers for `docket-core` integration tests.
//!
//! Lightweight fakes for the storage, fetch and sync ports so each test can
//! script failures without touching real infrastructure.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docket_core::{Fetcher, MemoryKv, RawEntry, SimpleKvStore, Store, StoreError, StoreResult, SyncHandler};
use docket_domain::{NetworkStatus, SyncOperation};
use parking_lot::Mutex;
use tokio::sync::watch;

pub fn memory_store() -> Arc<dyn Store> {
    Arc::new(SimpleKvStore::new(MemoryKv::new()))
}

/// Connectivity the test controls directly.
pub fn network(is_online: bool) -> (watch::Sender<NetworkStatus>, watch::Receiver<NetworkStatus>) {
    let status = if is_online { NetworkStatus::online() } else { NetworkStatus::offline() };
    watch::channel(status)
}

pub fn set_online(tx: &watch::Sender<NetworkStatus>, is_online: bool) {
    tx.send_modify(|status| status.is_online = is_online);
}

/// Store that fails every call while `broken` is set.
pub struct FlakyStore {
    inner: Arc<SimpleKvStore<MemoryKv>>,
    broken: AtomicBool,
}

impl FlakyStore {
    pub fn healthy() -> Self {
        Self { inner: Arc::new(SimpleKvStore::new(MemoryKv::new())), broken: AtomicBool::new(false) }
    }

    pub fn broken() -> Self {
        let store = Self::healthy();
        store.set_broken(true);
        store
    }

    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            Err(StoreError::backend("flaky", "disk unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<RawEntry>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, entry: RawEntry) -> StoreResult<()> {
        self.check()?;
        self.inner.put(key, entry).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.delete(key).await
    }
}

/// Fetcher that plays back a script of outcomes, then repeats the last one.
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Result<String, String>>,
    delay: Duration,
    calls: AtomicU32,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<&str, &str>>) -> Self {
        let script: VecDeque<Result<String, String>> = script
            .into_iter()
            .map(|step| step.map(str::to_string).map_err(str::to_string))
            .collect();
        Self {
            last: Mutex::new(Err("script exhausted".to_string())),
            script: Mutex::new(script),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn always(value: &str) -> Self {
        Self::new(vec![Ok(value)])
    }

    pub fn failing(message: &str) -> Self {
        Self::new(vec![Err(message)])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher<String> for ScriptedFetcher {
    async fn fetch(&self) -> anyhow::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let step = {
            let next = self.script.lock().pop_front();
            match next {
                Some(step) => {
                    *self.last.lock() = step.clone();
                    step
                }
                None => self.last.lock().clone(),
            }
        };
        step.map(|value| format!("{value}#{call}")).map_err(anyhow::Error::msg)
    }
}

/// Handler that records every batch and fails the configured entities.
#[derive(Default)]
pub struct RecordingHandler {
    batches: Mutex<Vec<Vec<SyncOperation>>>,
    failing_entities: Mutex<HashSet<String>>,
    error_out: AtomicBool,
    delay: Mutex<Duration>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_entity(&self, entity: &str) {
        self.failing_entities.lock().insert(entity.to_string());
    }

    /// Make `sync_batch` return an error instead of a failed subset.
    pub fn error_out(&self, enabled: bool) {
        self.error_out.store(enabled, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn batches(&self) -> Vec<Vec<SyncOperation>> {
        self.batches.lock().clone()
    }

    /// Entity names in delivery order across all batches.
    pub fn delivered_entities(&self) -> Vec<String> {
        self.batches.lock().iter().flatten().map(|op| op.entity_name.clone()).collect()
    }
}

#[async_trait]
impl SyncHandler for RecordingHandler {
    async fn sync_batch(&self, batch: Vec<SyncOperation>) -> anyhow::Result<Vec<SyncOperation>> {
        self.batches.lock().push(batch.clone());
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.error_out.load(Ordering::SeqCst) {
            anyhow::bail!("remote rejected the batch");
        }
        let failing = self.failing_entities.lock().clone();
        Ok(batch.into_iter().filter(|op| failing.contains(&op.entity_name)).collect())
    }
}
