//! Configuration loading
//!
//! Layers `.env`, an optional TOML/JSON file and `DOCKET_*` environment
//! overrides into a validated [`docket_domain::Config`].

pub mod loader;

pub use loader::{apply_env_overrides, load, load_from_file, probe_config_paths};
