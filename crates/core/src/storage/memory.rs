//! In-process string backend.

use async_trait::async_trait;
use dashmap::DashMap;

use super::errors::StoreResult;
use super::ports::StringKv;

/// Volatile [`StringKv`], for tests and for hosts without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw stored string, bypassing record decoding.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl StringKv for MemoryKv {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
