//! Offline mutation queue with prioritized, batched replay.
//!
//! Operations are appended durably, delivered in batches to a
//! [`SyncHandler`] when connectivity allows, retried on later cycles, and
//! dead-lettered once their retry budget is spent.
//!
//! ## Cycle
//!
//! 1. Snapshot the queue and sort it by priority (highest first), then by
//!    enqueue time (oldest first).
//! 2. Deliver it in chunks of `batch_size`, pausing `inter_batch_delay`
//!    between chunks. A handler error fails the whole chunk.
//! 3. Fold the results back into the live queue: successes and exhausted
//!    operations leave it, failures stay with `retry_count + 1`, and
//!    anything enqueued during the cycle is kept.
//!
//! A cycle is never cancelled once started. At most one runs at a time.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use docket_common::time::{Clock, SystemClock};
use docket_domain::constants::{SYNC_QUEUE_KEY, SYNC_STATS_KEY};
use docket_domain::{
    NetworkStatus, OperationKind, OverflowPolicy, Priority, QueueStats, SyncConfig,
    SyncOperation,
};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::errors::{QueueError, QueueResult};
use super::ports::SyncHandler;
use crate::storage::{PersistentStore, Store, StoreOptions};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Failed this cycle, still within their retry budget
    pub retrying: usize,
    /// Failed this cycle and dropped for good
    pub dead_lettered: usize,
    pub batches: usize,
}

struct QueueState {
    operations: Vec<SyncOperation>,
    stats: QueueStats,
    /// Bumped by `clear_queue` so an in-flight cycle can tell its snapshot
    /// was wiped.
    generation: u64,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct QueueInner {
    config: SyncConfig,
    handler: Arc<dyn SyncHandler>,
    network: watch::Receiver<NetworkStatus>,
    operations_store: PersistentStore<Vec<SyncOperation>>,
    stats_store: PersistentStore<QueueStats>,
    clock: Arc<dyn Clock>,
    state: Mutex<QueueState>,
    cycle_guard: Mutex<()>,
    status: watch::Sender<QueueStats>,
}

/// Durable sync queue. Clones share the same queue.
#[derive(Clone)]
pub struct SyncQueue {
    inner: Arc<QueueInner>,
    worker: Arc<SyncMutex<Option<Worker>>>,
}

impl SyncQueue {
    /// Restore the persisted queue and counters.
    pub async fn open(
        store: Arc<dyn Store>,
        handler: Arc<dyn SyncHandler>,
        network: watch::Receiver<NetworkStatus>,
        config: SyncConfig,
    ) -> QueueResult<Self> {
        Self::open_with_clock(store, handler, network, config, Arc::new(SystemClock)).await
    }

    #[instrument(skip_all, fields(max_queue_size = config.max_queue_size))]
    pub async fn open_with_clock(
        store: Arc<dyn Store>,
        handler: Arc<dyn SyncHandler>,
        network: watch::Receiver<NetworkStatus>,
        config: SyncConfig,
        clock: Arc<dyn Clock>,
    ) -> QueueResult<Self> {
        validate(&config)?;

        let operations_store = PersistentStore::new(
            Arc::clone(&store),
            StoreOptions::new(SYNC_QUEUE_KEY).with_compression(true),
            Vec::new(),
        )
        .with_clock(Arc::clone(&clock));
        let stats_store =
            PersistentStore::new(store, StoreOptions::new(SYNC_STATS_KEY), QueueStats::default())
                .with_clock(Arc::clone(&clock));

        let mut operations = operations_store.load().await;
        let mut stats = stats_store.load().await;

        if operations.len() > config.max_queue_size {
            let excess = operations.len() - config.max_queue_size;
            operations.drain(..excess);
            stats.evicted += excess as u64;
            warn!(excess, "Restored queue exceeded capacity; oldest operations evicted");
        }
        stats.pending = operations.len();
        info!(pending = stats.pending, failed = stats.failed, "Sync queue restored");

        let (status, _) = watch::channel(stats.clone());
        Ok(Self {
            inner: Arc::new(QueueInner {
                config,
                handler,
                network,
                operations_store,
                stats_store,
                clock,
                state: Mutex::new(QueueState { operations, stats, generation: 0 }),
                cycle_guard: Mutex::new(()),
                status,
            }),
            worker: Arc::new(SyncMutex::new(None)),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Enqueue a mutation and return its id.
    ///
    /// When the queue is full the oldest operation is evicted, or under
    /// [`OverflowPolicy::Reject`] the call fails. While online a sync cycle
    /// is triggered in the background.
    #[instrument(skip(self, entity_name, payload))]
    pub async fn add_operation(
        &self,
        kind: OperationKind,
        entity_name: impl Into<String>,
        payload: serde_json::Value,
        priority: Priority,
        max_retries: Option<u32>,
    ) -> QueueResult<Uuid> {
        let inner = &self.inner;
        let max_size = inner.config.max_queue_size;
        let operation = SyncOperation::new(
            kind,
            entity_name,
            payload,
            priority,
            max_retries.unwrap_or(inner.config.default_max_retries),
            inner.clock.now_millis(),
        );
        let id = operation.id;

        {
            let mut state = inner.state.lock().await;
            if state.operations.len() >= max_size
                && inner.config.overflow_policy == OverflowPolicy::Reject
            {
                warn!(max_size, "Sync queue full; operation rejected");
                return Err(QueueError::CapacityExceeded(max_size));
            }

            state.operations.push(operation);
            let excess = state.operations.len().saturating_sub(max_size);
            if excess > 0 {
                for evicted in state.operations.drain(..excess) {
                    warn!(
                        evicted_id = %evicted.id,
                        entity = %evicted.entity_name,
                        "Sync queue full; oldest operation evicted"
                    );
                }
                state.stats.evicted += excess as u64;
            }
            state.stats.pending = state.operations.len();
            inner.persist(&state).await;
            inner.publish(&state.stats);
        }
        debug!(%id, "Operation enqueued");

        if inner.is_online() {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                inner.try_cycle().await;
            });
        }
        Ok(id)
    }

    /// Run a sync cycle now. Returns `None` when offline, when the queue is
    /// empty, or when another cycle is already running.
    pub async fn perform_sync(&self) -> Option<SyncReport> {
        self.inner.try_cycle().await
    }

    /// Like [`perform_sync`](Self::perform_sync) but waits for a running
    /// cycle to finish instead of skipping.
    pub async fn force_sync(&self) -> Option<SyncReport> {
        if !self.inner.is_online() {
            debug!("Offline; forced sync skipped");
            return None;
        }
        let _guard = self.inner.cycle_guard.lock().await;
        self.inner.run_cycle().await
    }

    /// Drop every queued operation and reset the counters. Not recoverable.
    #[instrument(skip(self))]
    pub async fn clear_queue(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        let dropped = state.operations.len();
        state.operations.clear();
        state.stats = QueueStats::default();
        state.generation = state.generation.wrapping_add(1);
        inner.persist(&state).await;
        inner.publish(&state.stats);
        warn!(dropped, "Sync queue cleared");
    }

    pub fn queue_status(&self) -> QueueStats {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<QueueStats> {
        self.inner.status.subscribe()
    }

    /// Current queue contents in insertion order.
    pub async fn operations(&self) -> Vec<SyncOperation> {
        self.inner.state.lock().await.operations.clone()
    }

    /// Start the background trigger: a cycle on every offline to online
    /// transition and on each `sync_interval` tick while online, whenever
    /// the queue is non-empty.
    pub fn start(&self) -> QueueResult<()> {
        let mut slot = self.worker.lock();
        if slot.is_some() {
            return Err(QueueError::WorkerAlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let mut network = self.inner.network.clone();
        let was_online = network.borrow_and_update().is_online;
        let handle = tokio::spawn(trigger_loop(
            Arc::downgrade(&self.inner),
            network,
            was_online,
            self.inner.config.sync_interval(),
            cancel.clone(),
        ));
        *slot = Some(Worker { cancel, handle });
        info!(interval_secs = self.inner.config.sync_interval_secs, "Sync worker started");
        Ok(())
    }

    /// Stop the background trigger. A cycle already running completes.
    pub async fn stop(&self) -> QueueResult<()> {
        let Some(Worker { cancel, handle }) = self.worker.lock().take() else {
            return Err(QueueError::WorkerNotRunning);
        };

        cancel.cancel();
        match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
            Ok(Ok(())) => info!("Sync worker stopped"),
            Ok(Err(e)) => warn!(error = %e, "Sync worker task panicked"),
            Err(_) => warn!("Sync worker did not complete within timeout"),
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }
}

async fn trigger_loop(
    queue: Weak<QueueInner>,
    mut network: watch::Receiver<NetworkStatus>,
    mut was_online: bool,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        let trigger = tokio::select! {
            () = cancel.cancelled() => {
                debug!("Sync worker cancelled");
                break;
            }
            changed = network.changed() => {
                if changed.is_err() {
                    debug!("Network monitor dropped; sync worker exiting");
                    break;
                }
                let is_online = network.borrow_and_update().is_online;
                let reconnected = is_online && !was_online;
                was_online = is_online;
                reconnected.then_some("reconnect")
            }
            _ = ticker.tick() => Some("interval"),
        };

        let Some(trigger) = trigger else { continue };
        let Some(inner) = queue.upgrade() else { break };
        if inner.is_online() && inner.has_pending() {
            debug!(trigger, "Auto-triggering sync");
            inner.try_cycle().await;
        }
    }
}

impl QueueInner {
    fn is_online(&self) -> bool {
        self.network.borrow().is_online
    }

    fn has_pending(&self) -> bool {
        self.status.borrow().pending > 0
    }

    fn publish(&self, stats: &QueueStats) {
        self.status.send_replace(stats.clone());
    }

    /// Write queue and counters. Failures are logged; the in-memory queue
    /// stays authoritative for this process.
    async fn persist(&self, state: &QueueState) {
        if let Err(e) = self.operations_store.save(&state.operations).await {
            error!(error = %e, pending = state.operations.len(), "Failed to persist sync queue");
        }
        if let Err(e) = self.stats_store.save(&state.stats).await {
            warn!(error = %e, "Failed to persist sync counters");
        }
    }

    async fn try_cycle(&self) -> Option<SyncReport> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            debug!("Sync cycle already running; skipping");
            return None;
        };
        self.run_cycle().await
    }

    /// Caller must hold `cycle_guard`.
    #[instrument(skip(self))]
    async fn run_cycle(&self) -> Option<SyncReport> {
        if !self.is_online() {
            debug!("Offline; sync skipped");
            return None;
        }

        let (mut snapshot, generation) = {
            let state = self.state.lock().await;
            (state.operations.clone(), state.generation)
        };
        if snapshot.is_empty() {
            return None;
        }

        snapshot.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then_with(|| a.enqueued_at.cmp(&b.enqueued_at))
        });

        let mut report = SyncReport { attempted: snapshot.len(), ..SyncReport::default() };
        let mut succeeded = HashSet::new();
        let mut failed = Vec::new();

        for (index, chunk) in snapshot.chunks(self.config.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.inter_batch_delay()).await;
            }
            report.batches += 1;

            match self.handler.sync_batch(chunk.to_vec()).await {
                Ok(returned) => {
                    let failed_ids: HashSet<Uuid> = returned.iter().map(|op| op.id).collect();
                    for op in chunk {
                        if failed_ids.contains(&op.id) {
                            failed.push(op.clone());
                        } else {
                            succeeded.insert(op.id);
                        }
                    }
                }
                Err(e) => {
                    warn!(batch = index, size = chunk.len(), error = %e, "Sync handler failed; batch marked failed");
                    failed.extend(chunk.iter().cloned());
                }
            }
        }

        let mut retrying = HashMap::new();
        let mut dead = HashSet::new();
        for mut op in failed {
            op.retry_count += 1;
            if op.is_exhausted() {
                warn!(
                    id = %op.id,
                    entity = %op.entity_name,
                    kind = %op.kind,
                    attempts = op.retry_count,
                    "Operation exhausted its retries; dropping"
                );
                dead.insert(op.id);
            } else {
                retrying.insert(op.id, op);
            }
        }
        report.succeeded = succeeded.len();
        report.retrying = retrying.len();
        report.dead_lettered = dead.len();

        let mut state = self.state.lock().await;
        if state.generation != generation {
            info!("Queue cleared during sync; cycle results discarded");
            return Some(report);
        }

        let current = std::mem::take(&mut state.operations);
        state.operations = current
            .into_iter()
            .filter(|op| !succeeded.contains(&op.id) && !dead.contains(&op.id))
            .map(|op| retrying.remove(&op.id).unwrap_or(op))
            .collect();
        state.stats.completed += report.succeeded as u64;
        state.stats.failed += report.dead_lettered as u64;
        state.stats.pending = state.operations.len();
        state.stats.last_sync_at = Some(self.clock.now_utc());
        self.persist(&state).await;
        self.publish(&state.stats);

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            retrying = report.retrying,
            dead_lettered = report.dead_lettered,
            batches = report.batches,
            pending = state.stats.pending,
            "Sync cycle complete"
        );
        Some(report)
    }
}

fn validate(config: &SyncConfig) -> QueueResult<()> {
    if config.max_queue_size == 0 {
        return Err(QueueError::InvalidConfig("max_queue_size must be at least 1".into()));
    }
    if config.batch_size == 0 {
        return Err(QueueError::InvalidConfig("batch_size must be at least 1".into()));
    }
    if config.sync_interval_secs == 0 {
        return Err(QueueError::InvalidConfig("sync_interval_secs must be at least 1".into()));
    }
    Ok(())
}
