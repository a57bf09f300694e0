//! Domain constants
//!
//! Storage keys, thresholds and defaults shared across the offline core.

// Storage keys owned by the sync queue
pub const SYNC_QUEUE_KEY: &str = "offline_sync_queue";
pub const SYNC_STATS_KEY: &str = "sync_stats";

// Persisted record format
pub const STORAGE_FORMAT_VERSION: u32 = 1;
pub const DEFAULT_COMPRESSION_THRESHOLD_BYTES: usize = 1024;

// Link quality
pub const SLOW_DOWNLINK_MBPS: f64 = 1.5;

// Cache defaults
pub const DEFAULT_CACHE_TTL_ONLINE_SECS: u64 = 5 * 60;
pub const DEFAULT_CACHE_TTL_OFFLINE_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_FETCH_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_BASE_MS: u64 = 1_000;
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;
pub const DEFAULT_MIN_FETCH_INTERVAL_MS: u64 = 1_000;

// Sync queue defaults
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1_000;
pub const DEFAULT_SYNC_BATCH_SIZE: usize = 10;
pub const DEFAULT_SYNC_RETRY_DELAY_MS: u64 = 5_000;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_INTER_BATCH_DELAY_MS: u64 = 100;
pub const DEFAULT_OPERATION_MAX_RETRIES: u32 = 3;

// Network probe defaults
pub const DEFAULT_PROBE_POLL_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
