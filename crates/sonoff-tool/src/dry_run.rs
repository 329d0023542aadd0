//! Transport that prints frames instead of sending them

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use zcl_protocol::{
    AttributeStatus, Direction, FrameType, GlobalCommand, ProtocolError, ReadAttributesResponse,
    Status, WriteAttributesResponse, ZclFrame, ZclRequest, ZclTransport,
};

/// Logs outgoing frames and answers attribute commands locally.
///
/// Writes always succeed; reads report every attribute as unsupported.
#[derive(Debug, Default)]
pub struct DryRunTransport {
    sent: AtomicUsize,
}

impl DryRunTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames sent so far
    #[must_use]
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ZclTransport for DryRunTransport {
    async fn send(&self, request: ZclRequest) -> Result<Option<ZclFrame>, ProtocolError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        let frame = &request.frame;
        println!("-> {} {}", request.target, frame.to_hex());

        let reply = match frame.global_command() {
            Some(GlobalCommand::WriteAttributes) => (
                GlobalCommand::WriteAttributesResponse,
                WriteAttributesResponse::default().serialize(),
            ),
            Some(GlobalCommand::ReadAttributes) => {
                let failures = frame
                    .payload()
                    .chunks_exact(2)
                    .map(|id| AttributeStatus {
                        id: u16::from_le_bytes([id[0], id[1]]),
                        status: Status::UnsupportedAttribute,
                    })
                    .collect();
                let response = ReadAttributesResponse {
                    values: Vec::new(),
                    failures,
                };
                (GlobalCommand::ReadAttributesResponse, response.serialize()?)
            }
            _ => return Ok(None),
        };

        if !request.options.wait_for_response {
            return Ok(None);
        }
        let (command, payload) = reply;
        let response = ZclFrame::new(
            FrameType::Global,
            Direction::ServerToClient,
            frame.manufacturer_code(),
            frame.transaction_seq(),
            command as u8,
            payload,
        );
        tracing::debug!("<- {} {}", request.target, response.to_hex());
        Ok(Some(response))
    }
}
