//! Connectivity monitoring.

pub mod errors;
pub mod manual;
pub mod monitor;
pub mod ports;

pub use errors::MonitorError;
pub use manual::ManualProbe;
pub use monitor::NetworkMonitor;
pub use ports::{NetworkEvent, NetworkProbe, ProbeSnapshot};
