//! Port interfaces for durable storage backends

use std::sync::Arc;

use async_trait::async_trait;
use docket_domain::StorageEntry;

use super::errors::StoreResult;

/// Stored record whose `data` is the serialized (possibly compressed) value.
pub type RawEntry = StorageEntry<String>;

/// Backend with atomic get/put/delete of whole records by key.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> StoreResult<Option<RawEntry>>;

    async fn put(&self, key: &str, entry: RawEntry) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Backend that can only hold whole string values by string key.
#[async_trait]
pub trait StringKv: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn get(&self, key: &str) -> StoreResult<Option<RawEntry>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, entry: RawEntry) -> StoreResult<()> {
        (**self).put(key, entry).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }
}

#[async_trait]
impl<S: StringKv + ?Sized> StringKv for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }
}
