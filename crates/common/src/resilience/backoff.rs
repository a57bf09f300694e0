//! Retry delay calculation.

use std::time::Duration;

/// Strategy for spacing retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay before every retry
    Fixed(Duration),
    /// `initial_delay * base^(retry - 1)`, never above `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Doubling backoff starting at `initial_delay`, capped at `max_delay`.
    pub fn doubling(initial_delay: Duration, max_delay: Duration) -> Self {
        Self::Exponential { initial_delay, base: 2.0, max_delay }
    }

    /// Delay before the given retry. Retries are numbered from 1, so the
    /// first retry waits exactly `initial_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
                let millis = initial_delay.as_millis() as f64 * base.powi(exponent);
                let capped = millis.min(max_delay.as_millis() as f64);
                if capped.is_finite() && capped >= 0.0 {
                    Duration::from_millis(capped as u64)
                } else {
                    max_delay
                }
            }
        }
    }
}
