//! Network-aware read-through cache.

pub mod errors;
pub mod intelligent;
pub mod options;
pub mod ports;

pub use errors::{CacheError, CacheResult};
pub use intelligent::{CacheSnapshot, CacheStats, IntelligentCache};
pub use options::CacheOptions;
pub use ports::Fetcher;
