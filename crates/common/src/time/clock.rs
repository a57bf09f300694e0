//! Wall-clock abstraction for timestamping and TTL checks.
//!
//! Persisted records carry millisecond Unix timestamps, so the clock exposes
//! wall time rather than a monotonic instant. Tests inject [`MockClock`] to
//! move time across TTL boundaries without sleeping.
//!
//! ```
//! use std::time::Duration;
//!
//! use docket_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::at_millis(1_700_000_000_000);
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now_millis(), 1_700_000_005_000);
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64 {
        self.now_utc().timestamp_millis()
    }
}

/// Real system clock. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Clones share the same underlying time, so a clock handed to a component
/// can still be advanced from the test body.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Start at the current real time.
    pub fn new() -> Self {
        Self { current: Arc::new(Mutex::new(Utc::now())) }
    }

    /// Start at a fixed Unix timestamp in milliseconds.
    pub fn at_millis(millis: i64) -> Self {
        let start = Utc.timestamp_millis_opt(millis).single().unwrap_or_default();
        Self { current: Arc::new(Mutex::new(start)) }
    }

    pub fn advance(&self, duration: Duration) {
        let delta = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        let mut current = self.current.lock();
        *current = current.checked_add_signed(delta).unwrap_or(*current);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.current.lock() = at;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}
