//! # Docket Domain
//!
//! Data model for the offline caching and sync core.
//!
//! This crate contains:
//! - Network status and link quality snapshots
//! - Persisted record shapes (`StorageEntry`, `CacheEntry`, `SyncOperation`)
//! - Configuration structures with defaults and validation
//! - The application-facing error type and `Result` alias
//!
//! ## Architecture
//! - No dependencies on other Docket crates
//! - Pure data structures; behaviour lives in `docket-core`

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
