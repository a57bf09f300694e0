#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docket_core::{FallbackStore, SimpleKvStore, Store};
use docket_domain::Config;
use docket_infra::{FileKv, SqliteStore};
use tempfile::TempDir;

/// Temporary storage layout that keeps its directory alive for the duration
/// of a test run.
pub struct TestStorage {
    pub dir: TempDir,
}

impl TestStorage {
    pub fn new() -> Self {
        Self { dir: TempDir::new().expect("temp dir should be created") }
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.dir.path().join("docket.db")
    }

    pub fn kv_dir(&self) -> PathBuf {
        self.dir.path().join("kv")
    }

    pub fn sqlite(&self) -> SqliteStore {
        SqliteStore::open(self.sqlite_path(), 2).expect("sqlite store should open")
    }

    pub fn file_store(&self) -> Arc<dyn Store> {
        let kv = FileKv::open(self.kv_dir()).expect("file store should open");
        Arc::new(SimpleKvStore::new(kv))
    }

    /// SQLite primary, file secondary.
    pub fn stack(&self) -> (Arc<FallbackStore>, SqliteStore) {
        let sqlite = self.sqlite();
        let fallback = FallbackStore::new(Arc::new(sqlite.clone()), self.file_store());
        (Arc::new(fallback), sqlite)
    }

    /// Config pointing both backends into the temp dir, with no health URL.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.storage.sqlite_path = Some(self.sqlite_path().to_string_lossy().into_owned());
        config.storage.fallback_dir = self.kv_dir().to_string_lossy().into_owned();
        config.network.health_url = None;
        config
    }
}

impl Default for TestStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Break the SQLite backend underneath a live pool.
pub fn drop_entries_table(path: &Path) {
    let conn = rusqlite::Connection::open(path).expect("direct connection should open");
    conn.execute_batch("DROP TABLE storage_entries;").expect("table should drop");
}
