//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Load `.env` from the working directory (if present) into the process
//!    environment
//! 2. Read a config file: the explicit path, or the first probed location;
//!    with no file, start from defaults
//! 3. Apply `DOCKET_*` environment overrides
//! 4. Validate
//!
//! ## Environment Variables
//! - `DOCKET_SQLITE_PATH`: SQLite database path (empty disables SQLite)
//! - `DOCKET_FALLBACK_DIR`: Directory for the file-backed fallback store
//! - `DOCKET_HEALTH_URL`: Health endpoint polled for connectivity
//! - `DOCKET_SYNC_INTERVAL_SECS`: Periodic sync interval in seconds
//! - `DOCKET_SYNC_BATCH_SIZE`: Operations per sync batch
//! - `DOCKET_MAX_QUEUE_SIZE`: Sync queue capacity
//! - `DOCKET_LOG_LEVEL`: Default log level when `RUST_LOG` is unset
//! - `DOCKET_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./docket.toml`, `./docket.json`
//! 2. `./config.toml`, `./config.json`
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use docket_domain::{Config, DocketError, Result};

const FILE_NAMES: [&str; 4] = ["docket.toml", "docket.json", "config.toml", "config.json"];

/// Load configuration from every layer and validate it.
///
/// # Errors
/// Returns `DocketError::Config` if a file cannot be read or parsed, an
/// override is malformed, or the result fails validation.
pub fn load(path: Option<PathBuf>) -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(env_path) => tracing::debug!(path = %env_path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    let file = match path {
        Some(p) => Some(p),
        None => probe_config_paths(),
    };
    let mut config = match file {
        Some(p) => load_from_file(&p)?,
        None => {
            tracing::info!("No config file found; using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Parse a config file without applying overrides or validation.
///
/// Format is detected by extension (`.toml` or `.json`). Missing sections
/// and fields take their defaults.
///
/// # Errors
/// Returns `DocketError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(DocketError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| DocketError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DocketError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DocketError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(DocketError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Overlay `DOCKET_*` variables onto `config`.
///
/// # Errors
/// Returns `DocketError::Config` naming the variable when a value does not
/// parse.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(path) = std::env::var("DOCKET_SQLITE_PATH") {
        config.storage.sqlite_path = Some(path).filter(|p| !p.trim().is_empty());
    }
    if let Ok(dir) = std::env::var("DOCKET_FALLBACK_DIR") {
        config.storage.fallback_dir = dir;
    }
    if let Ok(url) = std::env::var("DOCKET_HEALTH_URL") {
        config.network.health_url = Some(url).filter(|u| !u.trim().is_empty());
    }
    if let Some(secs) = env_parse("DOCKET_SYNC_INTERVAL_SECS")? {
        config.sync.sync_interval_secs = secs;
    }
    if let Some(size) = env_parse("DOCKET_SYNC_BATCH_SIZE")? {
        config.sync.batch_size = size;
    }
    if let Some(size) = env_parse("DOCKET_MAX_QUEUE_SIZE")? {
        config.sync.max_queue_size = size;
    }
    if let Ok(level) = std::env::var("DOCKET_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env_bool("DOCKET_LOG_JSON") {
        config.logging.json = json;
    }
    Ok(())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DocketError::Config(format!("Invalid {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
