//! Resilience primitives used by retrying callers.

pub mod backoff;

pub use backoff::BackoffStrategy;
