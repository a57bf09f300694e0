//! Domain types and models

pub mod cache;
pub mod network;
pub mod storage;
pub mod sync;

pub use cache::{CacheEntry, CacheSource};
pub use network::{EffectiveConnectionType, LinkQuality, NetworkStatus};
pub use storage::StorageEntry;
pub use sync::{OperationKind, Priority, QueueStats, SyncOperation};
