//! Connectivity snapshot shared by every component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_label_conversions;

/// Coarse link class, as reported by platform link-quality APIs or inferred
/// from measured round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectiveConnectionType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl_domain_label_conversions!(EffectiveConnectionType {
    Slow2g => "slow-2g",
    TwoG => "2g",
    ThreeG => "3g",
    FourG => "4g",
    Unknown => "unknown",
});

impl EffectiveConnectionType {
    pub fn is_cellular_slow(self) -> bool {
        matches!(self, Self::Slow2g | Self::TwoG)
    }
}

/// Link-quality report. Every field is optional in practice; absent data
/// stays at the "unknown" defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkQuality {
    pub effective_type: EffectiveConnectionType,
    pub downlink_mbps: Option<f64>,
    pub rtt_ms: Option<u32>,
    pub data_saver_enabled: bool,
}

/// Live connectivity snapshot. Only the network monitor mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub is_online: bool,
    pub is_slow_connection: bool,
    pub effective_type: EffectiveConnectionType,
    pub downlink_mbps: Option<f64>,
    pub rtt_ms: Option<u32>,
    pub data_saver_enabled: bool,
    pub reconnect_attempts: u32,
    pub last_online_timestamp: Option<DateTime<Utc>>,
}

impl NetworkStatus {
    /// Online with no link-quality information.
    pub fn online() -> Self {
        Self {
            is_online: true,
            is_slow_connection: false,
            effective_type: EffectiveConnectionType::Unknown,
            downlink_mbps: None,
            rtt_ms: None,
            data_saver_enabled: false,
            reconnect_attempts: 0,
            last_online_timestamp: None,
        }
    }

    pub fn offline() -> Self {
        Self { is_online: false, ..Self::online() }
    }

    /// Replace link-quality fields and recompute `is_slow_connection`.
    pub fn apply_link(&mut self, link: LinkQuality, slow_threshold_mbps: f64) {
        self.effective_type = link.effective_type;
        self.downlink_mbps = link.downlink_mbps;
        self.rtt_ms = link.rtt_ms;
        self.data_saver_enabled = link.data_saver_enabled;
        self.is_slow_connection = Self::derive_slow(&link, slow_threshold_mbps);
    }

    /// Slow means a 2G-class link or a measured downlink below the threshold.
    pub fn derive_slow(link: &LinkQuality, slow_threshold_mbps: f64) -> bool {
        link.effective_type.is_cellular_slow()
            || link.downlink_mbps.is_some_and(|mbps| mbps < slow_threshold_mbps)
    }

    pub fn link(&self) -> LinkQuality {
        LinkQuality {
            effective_type: self.effective_type,
            downlink_mbps: self.downlink_mbps,
            rtt_ms: self.rtt_ms,
            data_saver_enabled: self.data_saver_enabled,
        }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::online()
    }
}
