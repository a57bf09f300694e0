//! Durable string-only backend: one file per key.
//!
//! Keys are hex-encoded into file names so any key is a valid, collision-free
//! path component. Writes go to a sibling temp file first and are renamed
//! into place, so a crash never leaves a half-written value behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use docket_core::{StoreResult, StringKv};
use docket_domain::Result as DomainResult;
use tokio::fs;
use tracing::debug;

use crate::errors::InfraError;

const BACKEND: &str = "file";
const EXTENSION: &str = "json";

/// Directory-backed [`StringKv`].
#[derive(Debug)]
pub struct FileKv {
    dir: PathBuf,
    temp_counter: AtomicU64,
}

impl FileKv {
    /// Use `dir`, creating it if missing.
    pub fn open<P: AsRef<Path>>(dir: P) -> DomainResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(InfraError::from)?;
        Ok(Self { dir, temp_counter: AtomicU64::new(0) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", hex::encode(key.as_bytes())))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(".{}.{n}.tmp", hex::encode(key.as_bytes())))
    }
}

fn backend_error(err: std::io::Error) -> docket_core::StoreError {
    InfraError::from(err).into_store_error(BACKEND)
}

#[async_trait]
impl StringKv for FileKv {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let temp = self.temp_path_for(key);
        let target = self.path_for(key);

        if let Err(e) = fs::write(&temp, value.as_bytes()).await {
            let _ = fs::remove_file(&temp).await;
            return Err(backend_error(e));
        }
        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(backend_error(e));
        }
        debug!(key, path = %target.display(), "file entry written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend_error(e)),
        }
    }
}
