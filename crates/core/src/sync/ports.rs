//! Port interface for delivering queued mutations

use std::future::Future;

use async_trait::async_trait;
use docket_domain::SyncOperation;

/// Replays a batch of operations against the remote system.
///
/// Returns the subset of `batch` that did not succeed, matched by id. An
/// `Err` marks the whole batch failed. Delivery is at-least-once, so
/// implementations must tolerate seeing the same operation again; each
/// operation's [`delivery_attempt`](SyncOperation::delivery_attempt) is
/// available for deduplication.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn sync_batch(&self, batch: Vec<SyncOperation>) -> anyhow::Result<Vec<SyncOperation>>;
}

#[async_trait]
impl<F, Fut> SyncHandler for F
where
    F: Fn(Vec<SyncOperation>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<SyncOperation>>> + Send,
{
    async fn sync_batch(&self, batch: Vec<SyncOperation>) -> anyhow::Result<Vec<SyncOperation>> {
        (self)(batch).await
    }
}
