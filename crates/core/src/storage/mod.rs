//! Durable, versioned, TTL-aware storage.
//!
//! [`PersistentStore`] is the typed front door. It talks to any [`Store`]:
//! a transactional backend, a [`SimpleKvStore`] over a string-only backend,
//! or a [`FallbackStore`] composing the two.

pub mod errors;
pub mod fallback;
pub mod memory;
pub mod persistent;
pub mod ports;
pub mod simple_kv;

pub use errors::{StoreError, StoreResult};
pub use fallback::FallbackStore;
pub use memory::MemoryKv;
pub use persistent::{PersistentStore, StoreOptions};
pub use ports::{RawEntry, Store, StringKv};
pub use simple_kv::SimpleKvStore;
