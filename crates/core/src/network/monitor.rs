//! Live, subscribable connectivity status.
//!
//! The monitor owns the only writable copy of [`NetworkStatus`]. Consumers
//! hold `watch::Receiver`s, re-read the snapshot whenever they like, and get
//! woken only when something actually changed.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use docket_core::network::{ManualProbe, NetworkMonitor};
//!
//! # async fn example() -> Result<(), docket_core::MonitorError> {
//! let probe = ManualProbe::new(true);
//! let mut monitor = NetworkMonitor::new(Arc::new(probe.clone()));
//! monitor.start().await?;
//!
//! let mut status = monitor.subscribe();
//! probe.set_offline();
//! status.changed().await.ok();
//! assert!(!status.borrow().is_online);
//!
//! monitor.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use docket_common::time::{Clock, SystemClock};
use docket_domain::constants::SLOW_DOWNLINK_MBPS;
use docket_domain::NetworkStatus;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::errors::MonitorError;
use super::ports::{NetworkEvent, NetworkProbe, ProbeSnapshot};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Connectivity monitor with explicit lifecycle management.
pub struct NetworkMonitor {
    probe: Arc<dyn NetworkProbe>,
    status: Arc<watch::Sender<NetworkStatus>>,
    slow_threshold_mbps: f64,
    clock: Arc<dyn Clock>,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl NetworkMonitor {
    /// Create a monitor. Until [`start`](Self::start) reads the probe, the
    /// status optimistically reports online with unknown link quality.
    pub fn new(probe: Arc<dyn NetworkProbe>) -> Self {
        let (status, _) = watch::channel(NetworkStatus::online());
        Self {
            probe,
            status: Arc::new(status),
            slow_threshold_mbps: SLOW_DOWNLINK_MBPS,
            clock: Arc::new(SystemClock),
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    pub fn with_slow_threshold(mut self, mbps: f64) -> Self {
        self.slow_threshold_mbps = mbps;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the status from the probe and start following its events.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), MonitorError> {
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }

        // Subscribe before reading the snapshot so no transition slips between.
        let mut events = self.probe.events();
        let snapshot = self.probe.snapshot().await;
        let now = self.clock.now_utc();
        let threshold = self.slow_threshold_mbps;
        self.status.send_modify(|status| seed(status, snapshot, now, threshold));
        info!(is_online = snapshot.is_online, "Network monitor started");

        self.cancellation = CancellationToken::new();
        let cancel = self.cancellation.clone();
        let status = Arc::clone(&self.status);
        let clock = Arc::clone(&self.clock);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("Network monitor loop cancelled");
                        break;
                    }
                    event = events.next() => {
                        let Some(event) = event else {
                            warn!("Network probe event stream ended");
                            break;
                        };
                        let now = clock.now_utc();
                        status.send_if_modified(|s| apply_event(s, event, now, threshold));
                    }
                }
            }
        });

        self.task_handle = Some(handle);
        Ok(())
    }

    /// Stop following probe events. The last status stays readable.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(MonitorError::NotRunning);
        };

        self.cancellation.cancel();
        match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "Network monitor task panicked");
                return Err(MonitorError::TaskJoin(e.to_string()));
            }
            Err(_) => {
                warn!("Network monitor task did not complete within timeout");
                return Err(MonitorError::TaskJoin("join timed out".to_string()));
            }
        }

        info!("Network monitor stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Feed an event directly, bypassing the probe.
    pub fn apply(&self, event: NetworkEvent) {
        let now = self.clock.now_utc();
        let threshold = self.slow_threshold_mbps;
        self.status.send_if_modified(|s| apply_event(s, event, now, threshold));
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> NetworkStatus {
        self.status.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        self.status.borrow().is_online
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

fn seed(
    status: &mut NetworkStatus,
    snapshot: ProbeSnapshot,
    now: chrono::DateTime<chrono::Utc>,
    threshold: f64,
) {
    status.is_online = snapshot.is_online;
    if snapshot.is_online {
        status.last_online_timestamp = Some(now);
    }
    status.apply_link(snapshot.link.unwrap_or_default(), threshold);
}

/// Apply one event; returns whether anything changed.
fn apply_event(
    status: &mut NetworkStatus,
    event: NetworkEvent,
    now: chrono::DateTime<chrono::Utc>,
    threshold: f64,
) -> bool {
    match event {
        NetworkEvent::Online if !status.is_online => {
            status.is_online = true;
            status.reconnect_attempts = 0;
            status.last_online_timestamp = Some(now);
            info!("Network became online");
            true
        }
        NetworkEvent::Offline if status.is_online => {
            status.is_online = false;
            status.reconnect_attempts = status.reconnect_attempts.saturating_add(1);
            info!(reconnect_attempts = status.reconnect_attempts, "Network became offline");
            true
        }
        NetworkEvent::Online | NetworkEvent::Offline => false,
        NetworkEvent::LinkChanged(link) => {
            let before = status.clone();
            status.apply_link(link, threshold);
            if status.is_slow_connection != before.is_slow_connection {
                debug!(
                    effective_type = %status.effective_type,
                    slow = status.is_slow_connection,
                    "Link quality changed"
                );
            }
            *status != before
        }
    }
}
