//! Shared foundation for the Docket crates.
//!
//! # Feature Tiers
//!
//! - `foundation`: error vocabulary and classification macros
//! - `runtime` (default): payload codec, clocks and backoff
//! - `test-utils`: marker tier for downstream suites that drive [`MockClock`]

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod codec;
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod time;

#[cfg(feature = "runtime")]
pub use codec::{CompressionAlgorithm, CompressionService};
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::BackoffStrategy;
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
