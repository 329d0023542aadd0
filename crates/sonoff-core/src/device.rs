//! Device description and variant profiles

use crate::cluster::id;
use serde::{Deserialize, Serialize};

/// Supported members of the relay family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceVariant {
    /// Relay with the Sonoff cluster: inching, detach mode, radio power
    #[serde(rename = "ZBMINIR2")]
    ZbMiniR2,
    /// Relay with power-on behavior only
    #[serde(rename = "ZBMINI")]
    ZbMini,
    /// Plain on/off relay
    #[serde(rename = "BASICZBR3")]
    BasicZbr3,
}

impl DeviceVariant {
    /// Pick the variant for a Basic cluster model identifier.
    /// Unknown models get the plain on/off profile.
    #[must_use]
    pub fn from_model(model: &str) -> Self {
        match model.trim() {
            "ZBMINIR2" | "ZBMINI-R2" => Self::ZbMiniR2,
            "ZBMINI" | "01MINIZB" => Self::ZbMini,
            "BASICZBR3" => Self::BasicZbr3,
            other => {
                tracing::warn!("Unknown model {:?}, using basic profile", other);
                Self::BasicZbr3
            }
        }
    }

    #[must_use]
    pub fn model(self) -> &'static str {
        match self {
            Self::ZbMiniR2 => "ZBMINIR2",
            Self::ZbMini => "ZBMINI",
            Self::BasicZbr3 => "BASICZBR3",
        }
    }

    /// Sonoff cluster attributes mirrored into the host settings
    #[must_use]
    pub fn settings_attributes(self) -> &'static [&'static str] {
        match self {
            Self::ZbMiniR2 => &[
                "TurboMode",
                "network_led",
                "power_on_delay_state",
                "power_on_delay_time",
                "switch_mode",
                "detach_mode",
            ],
            Self::ZbMini | Self::BasicZbr3 => &[],
        }
    }

    #[must_use]
    pub fn supports_inching(self) -> bool {
        matches!(self, Self::ZbMiniR2)
    }

    /// Bound toggles are turned into button presses
    #[must_use]
    pub fn supports_detach(self) -> bool {
        matches!(self, Self::ZbMiniR2)
    }

    #[must_use]
    pub fn supports_power_on_behavior(self) -> bool {
        matches!(self, Self::ZbMiniR2 | Self::ZbMini)
    }

    /// On/off state reporting configured at init
    #[must_use]
    pub fn on_off_reporting(self) -> Option<ReportingIntervals> {
        match self {
            Self::ZbMiniR2 => Some(ReportingIntervals {
                min_interval: 0,
                max_interval: 3600,
                min_change: None,
            }),
            Self::ZbMini => None,
            Self::BasicZbr3 => Some(ReportingIntervals {
                min_interval: 1,
                max_interval: 3600,
                min_change: Some(1),
            }),
        }
    }
}

/// Attribute reporting intervals, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingIntervals {
    pub min_interval: u16,
    pub max_interval: u16,
    /// Ignored for discrete attributes
    pub min_change: Option<i64>,
}

/// A device as known to the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZigbeeDevice {
    /// IEEE address (EUI-64)
    pub ieee_address: [u8; 8],
    /// Network short address
    pub nwk_address: u16,
    /// Model identifier (from Basic cluster)
    pub model: Option<String>,
    /// User-assigned friendly name
    pub friendly_name: Option<String>,
    /// Device endpoints
    pub endpoints: Vec<Endpoint>,
}

impl ZigbeeDevice {
    /// Create a new device with just address info
    #[must_use]
    pub fn new(ieee_address: [u8; 8], nwk_address: u16) -> Self {
        Self {
            ieee_address,
            nwk_address,
            model: None,
            friendly_name: None,
            endpoints: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Get IEEE address as hex string
    #[must_use]
    pub fn ieee_address_string(&self) -> String {
        format_ieee(&self.ieee_address)
    }

    /// Get a display name (friendly name, model, or IEEE address)
    #[must_use]
    pub fn display_name(&self) -> String {
        self.friendly_name
            .clone()
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| self.ieee_address_string())
    }

    #[must_use]
    pub fn endpoint(&self, id: u8) -> Option<&Endpoint> {
        self.endpoints.iter().find(|ep| ep.id == id)
    }

    #[must_use]
    pub fn variant(&self) -> DeviceVariant {
        self.model
            .as_deref()
            .map_or(DeviceVariant::BasicZbr3, DeviceVariant::from_model)
    }
}

/// IEEE address as colon-separated hex, most significant byte first
#[must_use]
pub fn format_ieee(ieee_address: &[u8; 8]) -> String {
    ieee_address
        .iter()
        .rev()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// A device endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint ID (1-240)
    pub id: u8,
    /// Profile ID (e.g., 0x0104 for Home Automation)
    pub profile_id: u16,
    /// Input (server) clusters
    pub in_clusters: Vec<u16>,
    /// Output (client) clusters
    pub out_clusters: Vec<u16>,
}

impl Endpoint {
    /// Endpoint with the clusters a relay of `variant` exposes
    #[must_use]
    pub fn for_variant(id: u8, variant: DeviceVariant) -> Self {
        let mut in_clusters = vec![id::BASIC, id::ON_OFF];
        if variant.supports_inching() {
            in_clusters.push(id::SONOFF);
        }
        Self {
            id,
            profile_id: zcl_protocol::profiles::HOME_AUTOMATION,
            in_clusters,
            out_clusters: Vec::new(),
        }
    }

    /// Check if endpoint serves a specific cluster
    #[must_use]
    pub fn has_server_cluster(&self, cluster_id: u16) -> bool {
        self.in_clusters.contains(&cluster_id)
    }
}
