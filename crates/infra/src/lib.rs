//! # Docket Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Storage backends: pooled SQLite and a directory-backed key/value store
//! - An HTTP health-check connectivity probe
//! - Configuration loading (`.env`, TOML/JSON files, `DOCKET_*` overrides)
//! - Logging initialization
//! - [`OfflineRuntime`], which wires everything together from a `Config`
//!
//! ## Architecture
//! - Implements traits defined in `docket-core`
//! - Depends on `docket-common`, `docket-domain` and `docket-core`
//! - Contains all "impure" code (filesystem, SQLite, HTTP)

pub mod config;
pub mod errors;
pub mod network;
pub mod observability;
pub mod runtime;
pub mod storage;

pub use errors::InfraError;
pub use network::{classify_rtt, HttpHealthProbe};
pub use observability::init_tracing;
pub use runtime::OfflineRuntime;
pub use storage::{FileKv, SqliteStore};
