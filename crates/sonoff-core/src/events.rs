//! Events published by the driver

use crate::inching::{ResponseOutcome, StatusResponse};
use serde_json::Value;
use std::fmt;

/// Event from one device
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub ieee_address: [u8; 8],
    pub kind: DeviceEventKind,
}

/// What happened
#[derive(Debug, Clone)]
pub enum DeviceEventKind {
    /// Inching status reported by the device
    StatusResponse {
        response: StatusResponse,
        outcome: ResponseOutcome,
    },
    /// Bound toggle received while detached
    ButtonPressed { count: u64 },
    /// Settings read back from the device
    SettingsRead {
        cluster: &'static str,
        values: crate::translate::Settings,
    },
    /// Unsolicited attribute report
    AttributesReported {
        cluster: &'static str,
        values: crate::translate::Settings,
    },
    /// Power-on behavior read back after a write
    PowerOnBehaviorVerified(Value),
}

impl fmt::Display for DeviceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusResponse { outcome, .. } => write!(f, "status response ({outcome:?})"),
            Self::ButtonPressed { count } => write!(f, "button pressed (#{count})"),
            Self::SettingsRead { cluster, values } => {
                write!(f, "{} settings read from {cluster}", values.len())
            }
            Self::AttributesReported { cluster, values } => {
                write!(f, "{} attributes reported by {cluster}", values.len())
            }
            Self::PowerOnBehaviorVerified(value) => {
                write!(f, "power-on behavior verified as {value}")
            }
        }
    }
}
