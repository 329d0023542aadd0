//! Error types for the Sonoff driver

use thiserror::Error;
use zcl_protocol::{ProtocolError, Status};

/// Caller contract violations of the inching command
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InchingError {
    /// `enabled` was not a boolean
    #[error("inching_enabled must be a boolean, got {0}")]
    EnabledNotBoolean(String),

    /// `time` was not a number
    #[error("inching_time must be a number of seconds, got {0}")]
    TimeNotNumber(String),

    /// `time` outside 0..=32767.5 seconds
    #[error("inching_time {0} s is out of range (0 to 32767.5)")]
    TimeOutOfRange(f64),

    /// `mode` outside the two-value enumeration
    #[error("inching_mode must be \"latch-open\" or \"latch-closed\", got {0}")]
    InvalidMode(String),
}

/// Errors raised by the driver
#[derive(Error, Debug)]
pub enum DriverError {
    /// Invalid inching request, rejected before any bytes are built
    #[error("Invalid inching request: {0}")]
    Inching(#[from] InchingError),

    /// Attribute name not in the cluster schema
    #[error("Unknown attribute {name} on cluster {cluster}")]
    UnknownAttribute { cluster: &'static str, name: String },

    /// Command id with no handler on this cluster
    #[error("Unknown command {command:#04X} on cluster {cluster:#06X}")]
    UnknownCommand { cluster: u16, command: u8 },

    /// Cluster not exposed by the device
    #[error("Cluster {0} not available on this device")]
    ClusterUnavailable(&'static str),

    /// Setting value cannot be converted to its wire type
    #[error("Invalid value for setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    /// Attribute read failed in the transport
    #[error("Failed to read attributes {attributes:?}: {source}")]
    Read {
        attributes: Vec<String>,
        #[source]
        source: ProtocolError,
    },

    /// Attribute write failed in the transport
    #[error("Failed to write attributes {attributes:?}: {source}")]
    Write {
        attributes: Vec<String>,
        #[source]
        source: ProtocolError,
    },

    /// Device answered a write with a non-success status
    #[error("Device rejected write of {attribute}: {status:?}")]
    WriteRejected { attribute: String, status: Status },

    /// Reporting configuration failed in the transport
    #[error("Failed to configure reporting of {attribute}: {source}")]
    Configure {
        attribute: String,
        #[source]
        source: ProtocolError,
    },

    /// Device refused a reporting configuration
    #[error("Device rejected reporting of {attribute}: {status:?}")]
    ReportingRejected { attribute: String, status: Status },

    /// Command send failed in the transport
    #[error("Failed to send {command}: {source}")]
    Send {
        command: &'static str,
        #[source]
        source: ProtocolError,
    },

    /// Malformed frame from the device
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No driver registered for the address
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
}
