//! Read-through cache that decides between stored data and the network.
//!
//! Decision procedure for [`IntelligentCache::get`]:
//!
//! | Connectivity | Cached entry | Action |
//! |--------------|--------------|--------|
//! | offline | any | serve cache (or `None`), never fetch |
//! | online | none | fetch |
//! | online | older than the online TTL | fetch |
//! | online | optimistic, `sync_on_reconnect` | fetch |
//! | online | fresh | serve cache |
//!
//! Staleness is judged against the TTL in effect at read time. Fetches are
//! single-flight per cache: a new fetch cancels the one in progress. Fetch
//! requests arriving within `min_fetch_interval` of the previous one are
//! skipped and answered from the cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use docket_common::resilience::BackoffStrategy;
use docket_common::time::{Clock, SystemClock};
use docket_domain::{CacheEntry, CacheSource, NetworkStatus};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::errors::{CacheError, CacheResult};
use super::options::CacheOptions;
use super::ports::Fetcher;
use crate::storage::{PersistentStore, Store, StoreOptions};

/// Point-in-time view of a cache, suitable for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot<T> {
    pub data: Option<T>,
    pub is_stale: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub source: Option<CacheSource>,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub retry_count: u32,
}

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub retries: u64,
    pub stale_fallbacks: u64,
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    retries: AtomicU64,
    stale_fallbacks: AtomicU64,
    skipped: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            stale_fallbacks: self.stale_fallbacks.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct FetchState {
    in_flight: Option<CancellationToken>,
    generation: u64,
    last_fetch_started: Option<Instant>,
    last_error: Option<String>,
    retry_count: u32,
}

struct Watcher {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct CacheInner<T> {
    options: CacheOptions,
    store: PersistentStore<Option<CacheEntry<T>>>,
    fetcher: Arc<dyn Fetcher<T>>,
    network: watch::Receiver<NetworkStatus>,
    clock: Arc<dyn Clock>,
    state: Mutex<FetchState>,
    counters: Counters,
}

/// Per-resource read-through cache. Clones share state.
pub struct IntelligentCache<T> {
    inner: Arc<CacheInner<T>>,
    watcher: Arc<Mutex<Option<Watcher>>>,
}

impl<T> Clone for IntelligentCache<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), watcher: Arc::clone(&self.watcher) }
    }
}

impl<T> IntelligentCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<dyn Store>,
        fetcher: Arc<dyn Fetcher<T>>,
        network: watch::Receiver<NetworkStatus>,
        options: CacheOptions,
    ) -> Self {
        Self::with_clock(store, fetcher, network, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn Store>,
        fetcher: Arc<dyn Fetcher<T>>,
        network: watch::Receiver<NetworkStatus>,
        options: CacheOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store_options = StoreOptions::new(options.key.clone())
            .with_ttl(options.storage_ttl())
            .with_compression(options.compress)
            .with_format_version(options.format_version);
        let store =
            PersistentStore::new(store, store_options, None).with_clock(Arc::clone(&clock));

        Self {
            inner: Arc::new(CacheInner {
                options,
                store,
                fetcher,
                network,
                clock,
                state: Mutex::new(FetchState::default()),
                counters: Counters::default(),
            }),
            watcher: Arc::new(Mutex::new(None)),
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    /// Serve from cache or network according to connectivity and freshness.
    ///
    /// Fails only when every fetch attempt failed and nothing was cached.
    pub async fn get(&self) -> CacheResult<Option<T>> {
        self.inner.get().await
    }

    /// Fetch now, ignoring freshness and the request spacing, with a fresh
    /// retry budget. Offline this serves the cache without fetching.
    pub async fn refetch(&self) -> CacheResult<Option<T>> {
        self.inner.refetch().await
    }

    /// Purge the cached entry, then refetch when online.
    #[instrument(skip(self), fields(key = %self.inner.options.key))]
    pub async fn invalidate(&self) -> CacheResult<Option<T>> {
        self.inner.store.remove().await?;
        info!("Cache entry invalidated");
        self.inner.refetch().await
    }

    /// Optimistic local write, tagged so it is reconciled once online.
    #[instrument(skip(self, value), fields(key = %self.inner.options.key))]
    pub async fn update_cache(&self, value: T) -> CacheResult<()> {
        let entry = CacheEntry::optimistic(
            value,
            self.inner.clock.now_millis(),
            self.inner.options.priority,
        );
        self.inner.store.save(&Some(entry)).await?;
        debug!("Optimistic cache update stored");
        Ok(())
    }

    /// The stored entry, without any network activity.
    pub async fn cached(&self) -> Option<CacheEntry<T>> {
        self.inner.store.load().await
    }

    pub async fn snapshot(&self) -> CacheSnapshot<T> {
        let entry = self.inner.store.load().await;
        let is_online = self.inner.network.borrow().is_online;
        let is_stale = entry.as_ref().map_or(true, |e| self.inner.is_stale(e, is_online));
        let state = self.inner.state.lock();
        CacheSnapshot {
            last_updated: entry
                .as_ref()
                .and_then(|e| Utc.timestamp_millis_opt(e.write_timestamp).single()),
            source: entry.as_ref().map(|e| e.source),
            data: entry.map(|e| e.data),
            is_stale,
            is_loading: state.in_flight.is_some(),
            last_error: state.last_error.clone(),
            retry_count: state.retry_count,
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot()
    }

    /// Watch connectivity and run [`get`](Self::get) on every offline to
    /// online transition. Returns `false` if already watching.
    pub fn spawn_reconnect_watcher(&self) -> bool {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let weak = Arc::downgrade(&self.inner);
        let mut network = self.inner.network.clone();
        // Baseline taken before the spawn so a transition racing the first
        // poll is still seen as a change.
        let was_online = network.borrow_and_update().is_online;
        let handle = tokio::spawn(reconnect_loop(weak, network, was_online, cancel.clone()));
        *slot = Some(Watcher { cancel, handle });
        true
    }

    /// Stop the reconnect watcher, if running.
    pub async fn stop(&self) {
        let watcher = self.watcher.lock().take();
        if let Some(Watcher { cancel, handle }) = watcher {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!(key = %self.inner.options.key, error = %e, "Reconnect watcher panicked");
            }
        }
    }
}

async fn reconnect_loop<T>(
    cache: Weak<CacheInner<T>>,
    mut network: watch::Receiver<NetworkStatus>,
    mut was_online: bool,
    cancel: CancellationToken,
) where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = network.changed() => {
                if changed.is_err() {
                    debug!("Network monitor dropped; reconnect watcher exiting");
                    break;
                }
                let is_online = network.borrow_and_update().is_online;
                let reconnected = is_online && !was_online;
                was_online = is_online;
                if !reconnected {
                    continue;
                }
                let Some(cache) = cache.upgrade() else { break };
                if let Err(e) = cache.get().await {
                    warn!(key = %cache.options.key, error = %e, "Reconnect refresh failed");
                }
            }
        }
    }
}

enum FetchMode {
    Normal,
    Forced,
}

impl<T> CacheInner<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn is_stale(&self, entry: &CacheEntry<T>, is_online: bool) -> bool {
        let ttl = self.options.effective_ttl(is_online);
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.clock.now_millis().saturating_sub(entry.write_timestamp) > ttl_ms
    }

    #[instrument(skip(self), fields(key = %self.options.key))]
    async fn get(&self) -> CacheResult<Option<T>> {
        let cached = self.store.load().await;
        let is_online = self.network.borrow().is_online;

        if !is_online {
            let counter =
                if cached.is_some() { &self.counters.hits } else { &self.counters.misses };
            Counters::bump(counter);
            debug!(cached = cached.is_some(), "Offline; serving cache");
            return Ok(cached.map(|e| e.data));
        }

        let needs_fetch = match &cached {
            None => true,
            Some(entry) => {
                self.is_stale(entry, true) || (self.options.sync_on_reconnect && entry.is_optimistic())
            }
        };

        if !needs_fetch {
            Counters::bump(&self.counters.hits);
            return Ok(cached.map(|e| e.data));
        }

        Counters::bump(&self.counters.misses);
        self.fetch(cached, FetchMode::Normal).await
    }

    #[instrument(skip(self), fields(key = %self.options.key))]
    async fn refetch(&self) -> CacheResult<Option<T>> {
        let cached = self.store.load().await;
        if !self.network.borrow().is_online {
            debug!("Offline; refetch deferred");
            return Ok(cached.map(|e| e.data));
        }
        self.fetch(cached, FetchMode::Forced).await
    }

    async fn fetch(
        &self,
        cached: Option<CacheEntry<T>>,
        mode: FetchMode,
    ) -> CacheResult<Option<T>> {
        let (token, generation) = {
            let mut state = self.state.lock();
            let now = Instant::now();

            if let (FetchMode::Normal, Some(last)) = (&mode, state.last_fetch_started) {
                if now.duration_since(last) < self.options.min_fetch_interval {
                    Counters::bump(&self.counters.skipped);
                    debug!("Fetch requested inside minimum interval; skipping");
                    return Ok(cached.map(|e| e.data));
                }
            }

            if let Some(previous) = state.in_flight.take() {
                debug!("Superseding in-flight fetch");
                previous.cancel();
            }
            if matches!(mode, FetchMode::Forced) {
                state.retry_count = 0;
            }

            let token = CancellationToken::new();
            state.generation = state.generation.wrapping_add(1);
            state.in_flight = Some(token.clone());
            state.last_fetch_started = Some(now);
            (token, state.generation)
        };

        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => None,
            result = self.fetch_with_retry() => Some(result),
        };

        {
            let mut state = self.state.lock();
            if state.generation == generation {
                state.in_flight = None;
            }
        }

        match outcome {
            None => {
                debug!("Fetch superseded; serving cache");
                Ok(cached.map(|e| e.data))
            }
            Some(Ok(_)) if token.is_cancelled() => Ok(cached.map(|e| e.data)),
            Some(Ok(value)) => {
                let entry = CacheEntry::from_network(
                    value.clone(),
                    self.clock.now_millis(),
                    self.options.priority,
                );
                if let Err(e) = self.store.save(&Some(entry)).await {
                    warn!(error = %e, "Fetched value could not be persisted");
                }
                Ok(Some(value))
            }
            Some(Err((attempts, e))) => {
                let message = format!("{e:#}");
                self.state.lock().last_error = Some(message.clone());
                match cached {
                    Some(entry) => {
                        Counters::bump(&self.counters.stale_fallbacks);
                        warn!(attempts, error = %message, "Fetch failed; serving cached value");
                        Ok(Some(entry.data))
                    }
                    None => Err(CacheError::FetchFailed {
                        key: self.options.key.clone(),
                        attempts,
                        message,
                    }),
                }
            }
        }
    }

    /// First attempt plus up to `max_retries` retries with capped doubling
    /// backoff, stopping early if connectivity drops. Errors carry the number
    /// of attempts made.
    async fn fetch_with_retry(&self) -> Result<T, (u32, anyhow::Error)> {
        let backoff =
            BackoffStrategy::doubling(self.options.retry_delay_base, self.options.max_retry_delay);
        let mut retry = 0_u32;

        loop {
            Counters::bump(&self.counters.fetches);
            match self.fetcher.fetch().await {
                Ok(value) => {
                    let mut state = self.state.lock();
                    state.retry_count = 0;
                    state.last_error = None;
                    return Ok(value);
                }
                Err(e) => {
                    Counters::bump(&self.counters.fetch_failures);
                    if retry >= self.options.max_retries {
                        return Err((retry + 1, e));
                    }
                    retry += 1;
                    self.state.lock().retry_count = retry;
                    let delay: Duration = backoff.delay_for_retry(retry);
                    Counters::bump(&self.counters.retries);
                    warn!(
                        key = %self.options.key,
                        retry,
                        max_retries = self.options.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Fetch failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    if !self.network.borrow().is_online {
                        debug!(key = %self.options.key, retry, "Went offline; abandoning retries");
                        return Err((retry, e));
                    }
                }
            }
        }
    }
}
