//! Transport seam between the cluster layer and a Zigbee stack
//!
//! The radio side (coordinator firmware, APS framing, addressing, binding) lives
//! outside this crate. It only has to move ZCL frames to and from an addressed
//! cluster instance.

use crate::frame::ZclFrame;
use crate::types::ProtocolError;
use async_trait::async_trait;
use std::time::Duration;

/// Default time to wait for a response frame
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Address of one cluster instance on one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterAddress {
    /// Network short address of the device
    pub nwk_address: u16,
    /// Endpoint ID (1-240)
    pub endpoint: u8,
    /// Cluster ID
    pub cluster_id: u16,
}

impl std::fmt::Display for ClusterAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:#06x}:{}/{:#06x}",
            self.nwk_address, self.endpoint, self.cluster_id
        )
    }
}

/// Per-request delivery options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Wait for a reply frame matching the transaction sequence
    pub wait_for_response: bool,
    /// Ask the device to send a ZCL default response
    pub expect_default_response: bool,
    /// How long to wait when `wait_for_response` is set
    pub timeout: Duration,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            wait_for_response: true,
            expect_default_response: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SendOptions {
    /// Options for commands whose outcome arrives later as an independent frame
    #[must_use]
    pub fn fire_and_forget() -> Self {
        Self {
            wait_for_response: false,
            expect_default_response: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A frame addressed to a cluster instance
#[derive(Debug, Clone)]
pub struct ZclRequest {
    pub target: ClusterAddress,
    pub frame: ZclFrame,
    pub options: SendOptions,
}

/// A frame received from a cluster instance
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub source: ClusterAddress,
    pub frame: ZclFrame,
}

impl InboundFrame {
    /// Parse raw ASDU bytes received from `source`
    pub fn parse(source: ClusterAddress, asdu: &[u8]) -> Result<Self, ProtocolError> {
        let frame = ZclFrame::parse(asdu)?;
        tracing::trace!("Frame from {}: {}", source, frame.to_hex());
        Ok(Self { source, frame })
    }
}

/// Capability to exchange ZCL frames with devices
#[async_trait]
pub trait ZclTransport: Send + Sync {
    /// Send a frame. When `options.wait_for_response` is set, the reply frame
    /// with the same transaction sequence is returned; otherwise `None`.
    async fn send(&self, request: ZclRequest) -> Result<Option<ZclFrame>, ProtocolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_parse() {
        let source = ClusterAddress {
            nwk_address: 0x1234,
            endpoint: 1,
            cluster_id: 0xFC11,
        };
        let inbound = InboundFrame::parse(source, &[0x18, 0x01, 0x04, 0x00]).unwrap();
        assert_eq!(inbound.frame.command_id(), 0x04);
        assert_eq!(source.to_string(), "0x1234:1/0xfc11");
    }

    #[test]
    fn test_fire_and_forget_options() {
        let opts = SendOptions::fire_and_forget();
        assert!(!opts.wait_for_response);
        assert!(!opts.expect_default_response);
    }
}
