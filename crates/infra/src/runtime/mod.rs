//! Runtime wiring - builds the offline stack from a [`Config`]
//!
//! One [`OfflineRuntime`] owns the storage stack, the connectivity monitor
//! and the sync queue opened against them. Caches are handed out on demand
//! and share the runtime's store and network status.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docket_core::{
    CacheOptions, FallbackStore, Fetcher, IntelligentCache, ManualProbe, NetworkMonitor,
    NetworkProbe, SimpleKvStore, Store, SyncHandler, SyncQueue,
};
use docket_domain::{Config, DocketError, NetworkStatus, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::network::HttpHealthProbe;
use crate::storage::{FileKv, SqliteStore};

const START_TIMEOUT: Duration = Duration::from_secs(10);

/// Offline-first runtime: storage, connectivity and the mutation queue.
pub struct OfflineRuntime {
    config: Config,
    store: Arc<dyn Store>,
    fallback: Option<Arc<FallbackStore>>,
    monitor: NetworkMonitor,
    manual_probe: Option<ManualProbe>,
    queue: Option<SyncQueue>,
    started: bool,
}

impl OfflineRuntime {
    /// Open the storage backends and prepare the monitor.
    ///
    /// With `storage.sqlite_path` set, SQLite is primary and the file
    /// backend in `storage.fallback_dir` is secondary. Without it, the file
    /// backend serves alone. With no `network.health_url`, connectivity is
    /// driven by hand through [`manual_probe`](Self::manual_probe).
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or a backend cannot
    /// be opened.
    pub fn build(config: Config) -> Result<Self> {
        config.validate()?;

        let file_store: Arc<dyn Store> =
            Arc::new(SimpleKvStore::new(FileKv::open(&config.storage.fallback_dir)?));

        let (store, fallback) = match config.storage.sqlite_path.as_deref() {
            Some(path) => {
                let sqlite = open_sqlite(Path::new(path), config.storage.pool_size)?;
                let fallback = Arc::new(FallbackStore::new(sqlite, file_store));
                (Arc::clone(&fallback) as Arc<dyn Store>, Some(fallback))
            }
            None => {
                info!(dir = %config.storage.fallback_dir, "SQLite disabled; using file storage only");
                (file_store, None)
            }
        };

        let (probe, manual_probe): (Arc<dyn NetworkProbe>, Option<ManualProbe>) =
            match HttpHealthProbe::from_config(&config.network)? {
                Some(http) => {
                    info!(url = %http.url(), "Using HTTP health probe");
                    (Arc::new(http), None)
                }
                None => {
                    let manual = ManualProbe::new(true);
                    (Arc::new(manual.clone()), Some(manual))
                }
            };

        let monitor =
            NetworkMonitor::new(probe).with_slow_threshold(config.network.slow_downlink_mbps);

        Ok(Self { config, store, fallback, monitor, manual_probe, queue: None, started: false })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The composed store every component persists through.
    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    /// Number of operations the secondary backend served after a primary
    /// failure. Always zero without SQLite.
    pub fn fallback_count(&self) -> u64 {
        self.fallback.as_ref().map_or(0, |f| f.fallback_count())
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    pub fn network(&self) -> watch::Receiver<NetworkStatus> {
        self.monitor.subscribe()
    }

    /// Hand-driven probe, present when no health URL is configured.
    pub fn manual_probe(&self) -> Option<&ManualProbe> {
        self.manual_probe.as_ref()
    }

    pub fn sync_queue(&self) -> Option<&SyncQueue> {
        self.queue.as_ref()
    }

    /// Read-through cache under `key`, using the configured cache defaults.
    ///
    /// The reconnect watcher is spawned when `cache.sync_on_reconnect` is
    /// set. It ends on its own once every clone of the cache is dropped.
    pub fn cache<T>(&self, key: &str, fetcher: Arc<dyn Fetcher<T>>) -> IntelligentCache<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let options = CacheOptions::from_config(key, &self.config.cache);
        let cache = IntelligentCache::new(self.store(), fetcher, self.network(), options);
        if self.config.cache.sync_on_reconnect {
            cache.spawn_reconnect_watcher();
        }
        cache
    }

    /// Open the sync queue, restoring persisted operations.
    ///
    /// Queue state lives under fixed keys, so a runtime owns a single queue.
    /// If the runtime is already started the worker starts immediately.
    ///
    /// # Errors
    /// Returns `DocketError::Sync` if a queue is already open, or the
    /// queue's own error if it rejects the configuration.
    pub async fn open_sync_queue(&mut self, handler: Arc<dyn SyncHandler>) -> Result<SyncQueue> {
        if self.queue.is_some() {
            return Err(DocketError::Sync("sync queue already open".to_string()));
        }

        let queue =
            SyncQueue::open(self.store(), handler, self.network(), self.config.sync.clone()).await?;
        if self.started {
            queue.start()?;
        }
        self.queue = Some(queue.clone());
        Ok(queue)
    }

    /// Start the monitor and, if open, the sync worker.
    ///
    /// # Errors
    /// Returns an error if already started or the monitor does not come up
    /// within ten seconds.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(DocketError::Internal("runtime already started".to_string()));
        }

        tokio::time::timeout(START_TIMEOUT, self.monitor.start())
            .await
            .map_err(|_| {
                tracing::error!(timeout_secs = START_TIMEOUT.as_secs(), "Network monitor start timed out");
                DocketError::Network("network monitor start timed out".to_string())
            })??;

        if let Some(queue) = &self.queue {
            queue.start()?;
        }

        self.started = true;
        info!(online = self.monitor.is_online(), "Offline runtime started");
        Ok(())
    }

    /// Stop the sync worker and the monitor. Persisted state is untouched.
    ///
    /// # Errors
    /// Returns an error if the runtime was not started.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.started {
            return Err(DocketError::Internal("runtime not started".to_string()));
        }

        if let Some(queue) = &self.queue {
            if let Err(e) = queue.stop().await {
                warn!(error = %e, "Failed to stop sync worker");
            }
        }
        self.monitor.stop().await?;

        self.started = false;
        info!("Offline runtime stopped");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

fn open_sqlite(path: &Path, pool_size: u32) -> Result<Arc<dyn Store>> {
    let store = SqliteStore::open(path, pool_size).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to open SQLite store");
        e
    })?;
    Ok(Arc::new(store))
}
