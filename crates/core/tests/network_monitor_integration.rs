//! Integration tests for the network monitor
//!
//! Drives `NetworkMonitor` through a `ManualProbe` and checks what
//! subscribers observe across the start/stop lifecycle.

use std::sync::Arc;
use std::time::Duration;

use docket_common::time::{Clock, MockClock};
use docket_core::{ManualProbe, MonitorError, NetworkMonitor};
use docket_domain::{EffectiveConnectionType, LinkQuality};

async fn changed(rx: &mut tokio::sync::watch::Receiver<docket_domain::NetworkStatus>) {
    tokio::time::timeout(Duration::from_secs(1), rx.changed())
        .await
        .expect("status change within timeout")
        .expect("monitor alive");
}

/// Validates subscribers observe transitions and reconnect bookkeeping.
///
/// Assertions:
/// - Confirms the status seeds from the probe on start.
/// - Confirms offline then online updates attempts and timestamp.
#[tokio::test]
async fn test_transitions_reach_subscribers() -> Result<(), MonitorError> {
    let probe = ManualProbe::new(false);
    let clock = MockClock::at_millis(1_700_000_000_000);
    let mut monitor =
        NetworkMonitor::new(Arc::new(probe.clone())).with_clock(Arc::new(clock.clone()));
    monitor.start().await?;
    assert!(!monitor.is_online());

    let mut rx = monitor.subscribe();
    probe.set_online();
    changed(&mut rx).await;
    let status = rx.borrow_and_update().clone();
    assert!(status.is_online);
    assert_eq!(status.last_online_timestamp, Some(clock.now_utc()));

    probe.set_offline();
    changed(&mut rx).await;
    assert_eq!(rx.borrow_and_update().reconnect_attempts, 1);

    monitor.stop().await?;
    Ok(())
}

/// Validates a slow link is flagged from downlink or connection type.
///
/// Assertions:
/// - Confirms a 1 Mbps downlink is slow.
/// - Confirms a 4g link with good downlink is not.
#[tokio::test]
async fn test_slow_link_detection() -> Result<(), MonitorError> {
    let probe = ManualProbe::new(true);
    let mut monitor = NetworkMonitor::new(Arc::new(probe.clone()));
    monitor.start().await?;
    let mut rx = monitor.subscribe();

    probe.set_link(LinkQuality {
        effective_type: EffectiveConnectionType::ThreeG,
        downlink_mbps: Some(1.0),
        rtt_ms: Some(300),
        data_saver_enabled: false,
    });
    changed(&mut rx).await;
    assert!(rx.borrow_and_update().is_slow_connection);

    probe.set_link(LinkQuality {
        effective_type: EffectiveConnectionType::FourG,
        downlink_mbps: Some(20.0),
        rtt_ms: Some(50),
        data_saver_enabled: false,
    });
    changed(&mut rx).await;
    let status = monitor.status();
    assert!(!status.is_slow_connection);
    assert_eq!(status.effective_type, EffectiveConnectionType::FourG);

    monitor.stop().await?;
    Ok(())
}

/// Validates lifecycle guards.
///
/// Assertions:
/// - Ensures starting twice and stopping twice are rejected.
/// - Confirms the last status stays readable after stop.
#[tokio::test]
async fn test_lifecycle_guards() {
    let probe = ManualProbe::new(true);
    let mut monitor = NetworkMonitor::new(Arc::new(probe));

    assert!(matches!(monitor.stop().await, Err(MonitorError::NotRunning)));
    monitor.start().await.unwrap();
    assert!(matches!(monitor.start().await, Err(MonitorError::AlreadyRunning)));
    monitor.stop().await.unwrap();
    assert!(matches!(monitor.stop().await, Err(MonitorError::NotRunning)));
    assert!(monitor.is_online());
}
