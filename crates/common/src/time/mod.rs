//! Time abstractions shared by the storage and cache layers.

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
