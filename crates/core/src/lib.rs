//! # Docket Core
//!
//! Offline-first caching and synchronization logic, free of infrastructure.
//!
//! This crate contains:
//! - [`network`]: the connectivity monitor and its probe port
//! - [`storage`]: the versioned, TTL-aware persistent store and its backend
//!   ports, plus the fallback decorator composing two backends
//! - [`cache`]: the network-aware read-through cache
//! - [`sync`]: the durable, prioritized mutation queue
//!
//! ## Architecture Principles
//! - Only depends on `docket-common` and `docket-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Every component is constructible many times with independent state

pub mod cache;
pub mod network;
pub mod storage;
pub mod sync;

pub use cache::ports::Fetcher;
pub use cache::{CacheError, CacheOptions, CacheSnapshot, CacheStats, IntelligentCache};
pub use network::ports::{NetworkEvent, NetworkProbe, ProbeSnapshot};
pub use network::{ManualProbe, MonitorError, NetworkMonitor};
pub use storage::ports::{RawEntry, Store, StringKv};
pub use storage::{
    FallbackStore, MemoryKv, PersistentStore, SimpleKvStore, StoreError, StoreOptions,
    StoreResult,
};
pub use sync::ports::SyncHandler;
pub use sync::{QueueError, QueueResult, SyncQueue, SyncReport};
