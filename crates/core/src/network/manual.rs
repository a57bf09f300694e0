//! Probe driven by the embedding application.

use std::sync::Arc;

use async_trait::async_trait;
use docket_domain::LinkQuality;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::warn;

use super::ports::{NetworkEvent, NetworkProbe, ProbeSnapshot};

const EVENT_BUFFER: usize = 64;

/// Probe whose events are pushed by the host, typically from platform
/// connectivity callbacks. Clones share state.
#[derive(Debug, Clone)]
pub struct ManualProbe {
    current: Arc<Mutex<ProbeSnapshot>>,
    events: broadcast::Sender<NetworkEvent>,
}

impl ManualProbe {
    pub fn new(is_online: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { current: Arc::new(Mutex::new(ProbeSnapshot { is_online, link: None })), events }
    }

    pub fn set_online(&self) {
        self.current.lock().is_online = true;
        self.emit(NetworkEvent::Online);
    }

    pub fn set_offline(&self) {
        self.current.lock().is_online = false;
        self.emit(NetworkEvent::Offline);
    }

    pub fn set_link(&self, link: LinkQuality) {
        self.current.lock().link = Some(link);
        self.emit(NetworkEvent::LinkChanged(link));
    }

    fn emit(&self, event: NetworkEvent) {
        // No receivers simply means nobody is monitoring yet.
        let _ = self.events.send(event);
    }
}

impl Default for ManualProbe {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl NetworkProbe for ManualProbe {
    async fn snapshot(&self) -> ProbeSnapshot {
        *self.current.lock()
    }

    fn events(&self) -> BoxStream<'static, NetworkEvent> {
        let receiver = self.events.subscribe();
        stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "network event receiver lagged; continuing");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
