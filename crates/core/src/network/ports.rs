//! Port interfaces for connectivity observation

use async_trait::async_trait;
use docket_domain::LinkQuality;
use futures::stream::BoxStream;

/// Connectivity or link-quality change reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NetworkEvent {
    Online,
    Offline,
    LinkChanged(LinkQuality),
}

/// Point-in-time view used to seed the monitor on start.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeSnapshot {
    pub is_online: bool,
    /// `None` when the platform offers no link-quality information.
    pub link: Option<LinkQuality>,
}

/// Source of connectivity information.
///
/// Browser-like hosts forward platform notifications; services and CLIs
/// implement this with reachability pings or health-check polling.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Current connectivity, read once when monitoring starts.
    async fn snapshot(&self) -> ProbeSnapshot;

    /// Stream of changes. Ends when the probe shuts down.
    fn events(&self) -> BoxStream<'static, NetworkEvent>;
}
