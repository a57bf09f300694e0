//! Reachability probe that polls an HTTP health endpoint.
//!
//! A 2xx answer within the request timeout means online. The measured round
//! trip classifies the link:
//!
//! | RTT | Effective type |
//! |-----|----------------|
//! | ≥ 2000 ms | slow-2g |
//! | ≥ 1400 ms | 2g |
//! | ≥ 270 ms | 3g |
//! | otherwise | 4g |

use std::time::Duration;

use async_trait::async_trait;
use docket_core::{NetworkEvent, NetworkProbe, ProbeSnapshot};
use docket_domain::{DocketError, EffectiveConnectionType, LinkQuality, NetworkConfig, Result as DomainResult};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, instrument};
use url::Url;

use crate::errors::InfraError;

/// Polling health-check probe. Clones share the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: Client,
    url: Url,
    poll_interval: Duration,
}

impl HttpHealthProbe {
    pub fn new(url: &str, poll_interval: Duration, request_timeout: Duration) -> DomainResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| DocketError::Config(format!("network.health_url: {e}")))?;
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()
            .map_err(InfraError::from)?;
        Ok(Self { client, url, poll_interval })
    }

    /// Build from configuration; `None` when no health URL is configured.
    pub fn from_config(config: &NetworkConfig) -> DomainResult<Option<Self>> {
        config
            .health_url
            .as_deref()
            .map(|url| Self::new(url, config.poll_interval(), config.request_timeout()))
            .transpose()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Issue one health request.
    #[instrument(skip(self), fields(url = %self.url), level = "debug")]
    pub async fn check(&self) -> ProbeSnapshot {
        let started = Instant::now();
        match self.client.get(self.url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                let rtt = started.elapsed();
                let rtt_ms = u32::try_from(rtt.as_millis()).unwrap_or(u32::MAX);
                debug!(status = %response.status(), rtt_ms, "health check succeeded");
                ProbeSnapshot {
                    is_online: true,
                    link: Some(LinkQuality {
                        effective_type: classify_rtt(rtt),
                        downlink_mbps: None,
                        rtt_ms: Some(rtt_ms),
                        data_saver_enabled: false,
                    }),
                }
            }
            Ok(response) => {
                debug!(status = %response.status(), "health check returned non-success status");
                ProbeSnapshot { is_online: false, link: None }
            }
            Err(e) => {
                let error = DocketError::from(InfraError::from(e));
                debug!(%error, "health check failed");
                ProbeSnapshot { is_online: false, link: None }
            }
        }
    }
}

/// Map a measured round trip to a connection class.
pub fn classify_rtt(rtt: Duration) -> EffectiveConnectionType {
    match rtt.as_millis() {
        ms if ms >= 2000 => EffectiveConnectionType::Slow2g,
        ms if ms >= 1400 => EffectiveConnectionType::TwoG,
        ms if ms >= 270 => EffectiveConnectionType::ThreeG,
        _ => EffectiveConnectionType::FourG,
    }
}

/// Events needed to move an observer from `previous` to `current`.
fn diff(previous: Option<ProbeSnapshot>, current: ProbeSnapshot) -> Vec<NetworkEvent> {
    let mut events = Vec::new();
    let online_changed = previous.map_or(true, |p| p.is_online != current.is_online);
    if online_changed {
        events.push(if current.is_online { NetworkEvent::Online } else { NetworkEvent::Offline });
    }

    if let Some(link) = current.link {
        let previous_type = previous.and_then(|p| p.link).map(|l| l.effective_type);
        if previous_type != Some(link.effective_type) {
            events.push(NetworkEvent::LinkChanged(link));
        }
    }
    events
}

#[async_trait]
impl NetworkProbe for HttpHealthProbe {
    async fn snapshot(&self) -> ProbeSnapshot {
        self.check().await
    }

    fn events(&self) -> BoxStream<'static, NetworkEvent> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let probe = self.clone();

        stream::unfold((probe, ticker, None), |(probe, mut ticker, previous)| async move {
            ticker.tick().await;
            let current = probe.check().await;
            let events = diff(previous, current);
            Some((events, (probe, ticker, Some(current))))
        })
        .flat_map(stream::iter)
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn rtt_thresholds() {
        assert_eq!(classify_rtt(Duration::from_millis(50)), EffectiveConnectionType::FourG);
        assert_eq!(classify_rtt(Duration::from_millis(269)), EffectiveConnectionType::FourG);
        assert_eq!(classify_rtt(Duration::from_millis(270)), EffectiveConnectionType::ThreeG);
        assert_eq!(classify_rtt(Duration::from_millis(1400)), EffectiveConnectionType::TwoG);
        assert_eq!(classify_rtt(Duration::from_millis(2500)), EffectiveConnectionType::Slow2g);
    }

    #[test]
    fn diff_emits_only_changes() {
        let online = ProbeSnapshot {
            is_online: true,
            link: Some(LinkQuality { effective_type: EffectiveConnectionType::FourG, ..Default::default() }),
        };
        assert_eq!(diff(None, online), vec![NetworkEvent::Online, NetworkEvent::LinkChanged(online.link.unwrap())]);
        assert!(diff(Some(online), online).is_empty());

        let offline = ProbeSnapshot { is_online: false, link: None };
        assert_eq!(diff(Some(online), offline), vec![NetworkEvent::Offline]);
    }

    #[tokio::test]
    async fn healthy_endpoint_is_online() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = HttpHealthProbe::new(
            &format!("{}/health", server.uri()),
            Duration::from_secs(15),
            Duration::from_secs(2),
        )
        .unwrap();

        let snapshot = probe.snapshot().await;
        assert!(snapshot.is_online);
        assert!(snapshot.link.and_then(|l| l.rtt_ms).is_some());
    }

    #[tokio::test]
    async fn server_error_and_timeout_are_offline() {
        let server = MockServer::start().await;
        Mock::given(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let down = HttpHealthProbe::new(
            &format!("{}/down", server.uri()),
            Duration::from_secs(15),
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(!down.check().await.is_online);

        let slow = HttpHealthProbe::new(
            &format!("{}/slow", server.uri()),
            Duration::from_secs(15),
            Duration::from_millis(100),
        )
        .unwrap();
        assert!(!slow.check().await.is_online);
    }

    #[test]
    fn invalid_url_is_config_error() {
        let err = HttpHealthProbe::new("not a url", Duration::from_secs(1), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, DocketError::Config(_)));
    }

    #[tokio::test]
    async fn event_stream_reports_outage() {
        let server = MockServer::start().await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let probe = HttpHealthProbe::new(
            &format!("{}/health", server.uri()),
            Duration::from_millis(20),
            Duration::from_secs(1),
        )
        .unwrap();
        let mut events = probe.events();
        let first = tokio::time::timeout(Duration::from_secs(5), events.next()).await.unwrap();
        assert_eq!(first, Some(NetworkEvent::Offline));
    }
}
