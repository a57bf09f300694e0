//! Durable, prioritized mutation queue.

pub mod errors;
pub mod ports;
pub mod queue;

pub use errors::{QueueError, QueueResult};
pub use ports::SyncHandler;
pub use queue::{SyncQueue, SyncReport};
