//! Adapts a string-only backend to the record-level [`Store`] port.

use async_trait::async_trait;

use super::errors::{StoreError, StoreResult};
use super::ports::{RawEntry, Store, StringKv};

/// Stores each record as one JSON string under its key.
#[derive(Debug)]
pub struct SimpleKvStore<S> {
    kv: S,
}

impl<S: StringKv> SimpleKvStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn inner(&self) -> &S {
        &self.kv
    }
}

#[async_trait]
impl<S: StringKv> Store for SimpleKvStore<S> {
    fn name(&self) -> &str {
        self.kv.name()
    }

    async fn get(&self, key: &str) -> StoreResult<Option<RawEntry>> {
        let Some(text) = self.kv.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::Codec { key: key.to_string(), message: e.to_string() })
    }

    async fn put(&self, key: &str, entry: RawEntry) -> StoreResult<()> {
        let text = serde_json::to_string(&entry)?;
        self.kv.set(key, text).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.kv.delete(key).await
    }
}
