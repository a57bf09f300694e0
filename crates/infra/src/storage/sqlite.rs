//! Transactional SQLite backend for the [`Store`] port.
//!
//! Each record is one row in `storage_entries`; every call runs in its own
//! transaction on a pooled connection inside `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use docket_core::{RawEntry, Store, StoreError, StoreResult};
use docket_domain::{DocketError, Result as DomainResult};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tokio::task;
use tracing::{debug, info, instrument};

use crate::errors::InfraError;

const BACKEND: &str = "sqlite";
const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite-backed store on an r2d2 connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> DomainResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(InfraError::from)?;
        }

        let manager = SqliteConnectionManager::file(&path).with_init(apply_connection_pragmas);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(InfraError::from)?;

        let store = Self { pool, path };
        store.run_migrations()?;
        info!(db_path = %store.path.display(), max_connections = pool_size.max(1), "sqlite store initialised");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify a pooled connection answers a trivial query.
    pub fn health_check(&self) -> DomainResult<()> {
        let conn = self.connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(map_sql_error)?;
        Ok(())
    }

    fn connection(&self) -> DomainResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| InfraError::from(e).into())
    }

    fn run_migrations(&self) -> DomainResult<()> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
            params![SCHEMA_VERSION],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    async fn blocking<R, F>(&self, op: F) -> StoreResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<R, rusqlite::Error> + Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || -> Result<R, InfraError> {
            let mut conn = pool.get()?;
            Ok(op(&mut conn)?)
        })
        .await
        .map_err(|e| StoreError::backend(BACKEND, map_join_error(e)))?
        .map_err(|e| e.into_store_error(BACKEND))
    }
}

fn apply_connection_pragmas(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA wal_autocheckpoint=1000;
         PRAGMA synchronous=NORMAL;",
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

#[async_trait]
impl Store for SqliteStore {
    fn name(&self) -> &str {
        BACKEND
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> StoreResult<Option<RawEntry>> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
            let entry = tx
                .query_row(
                    "SELECT data, write_timestamp, ttl_ms, format_version, is_compressed
                     FROM storage_entries WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok(RawEntry {
                            data: row.get(0)?,
                            write_timestamp: row.get(1)?,
                            ttl_ms: row.get::<_, Option<i64>>(2)?.and_then(|t| u64::try_from(t).ok()),
                            format_version: row.get(3)?,
                            is_compressed: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            tx.commit()?;
            Ok(entry)
        })
        .await
    }

    #[instrument(skip(self, entry), level = "debug")]
    async fn put(&self, key: &str, entry: RawEntry) -> StoreResult<()> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO storage_entries
                    (key, data, write_timestamp, ttl_ms, format_version, is_compressed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(key) DO UPDATE SET
                    data = excluded.data,
                    write_timestamp = excluded.write_timestamp,
                    ttl_ms = excluded.ttl_ms,
                    format_version = excluded.format_version,
                    is_compressed = excluded.is_compressed",
                params![
                    key,
                    entry.data,
                    entry.write_timestamp,
                    entry.ttl_ms.map(|t| i64::try_from(t).unwrap_or(i64::MAX)),
                    entry.format_version,
                    entry.is_compressed,
                ],
            )?;
            tx.commit()?;
            debug!(key, "sqlite entry written");
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> StoreResult<()> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM storage_entries WHERE key = ?1", params![key])?;
            tx.commit()
        })
        .await
    }
}

fn map_sql_error(err: rusqlite::Error) -> DocketError {
    DocketError::from(InfraError::from(err))
}

fn map_join_error(err: task::JoinError) -> String {
    if err.is_cancelled() {
        "blocking sqlite task cancelled".to_string()
    } else {
        format!("blocking sqlite task failed: {err}")
    }
}
