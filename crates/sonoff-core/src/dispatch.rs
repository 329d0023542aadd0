//! Classification of inbound frames on the Sonoff cluster

use crate::cluster::CMD_PROTOCOL_DATA_RESPONSE;
use crate::inching::StatusResponse;
use zcl_protocol::{GlobalCommand, ZclFrame};

/// What to do with a frame received on the Sonoff cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Write Attributes Response: consumed without further action
    Acknowledged,
    /// `protocolDataResponse` carrying an inching status
    StatusResponse(StatusResponse),
    /// Everything else goes to generic command handling
    Forward,
}

/// Classify a frame by command id alone.
///
/// The device sends `protocolDataResponse` both with and without the
/// cluster-specific frame type bit, so the frame type is not consulted.
#[must_use]
pub fn classify(frame: &ZclFrame) -> Disposition {
    match frame.command_id() {
        id if id == GlobalCommand::WriteAttributesResponse as u8 => {
            tracing::debug!(
                "Write attributes response acknowledged (seq {})",
                frame.transaction_seq()
            );
            Disposition::Acknowledged
        }
        CMD_PROTOCOL_DATA_RESPONSE => {
            let response = StatusResponse::from_payload(frame.payload());
            tracing::debug!(
                "Protocol data response: type={:?} code={:?}",
                response.response_type,
                response.code
            );
            Disposition::StatusResponse(response)
        }
        _ => Disposition::Forward,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inching::ResponseOutcome;
    use zcl_protocol::{Direction, FrameType};

    fn inbound(frame_type: FrameType, command_id: u8, payload: Vec<u8>) -> ZclFrame {
        ZclFrame::new(
            frame_type,
            Direction::ServerToClient,
            Some(0x1286),
            0x42,
            command_id,
            payload,
        )
    }

    #[test]
    fn test_write_response_acknowledged() {
        let frame = inbound(FrameType::Global, 0x04, vec![0x00]);
        assert_eq!(classify(&frame), Disposition::Acknowledged);
    }

    #[test]
    fn test_status_response() {
        let frame = inbound(FrameType::ClusterSpecific, 0x0B, vec![0x01, 0x81]);
        match classify(&frame) {
            Disposition::StatusResponse(rsp) => {
                assert_eq!(rsp.response_type, Some(0x01));
                assert_eq!(rsp.code, Some(0x81));
                assert_eq!(rsp.outcome(), ResponseOutcome::Rejected);
            }
            other => panic!("unexpected disposition {other:?}"),
        }

        // Same command id with the global frame type
        let frame = inbound(FrameType::Global, 0x0B, vec![0x01, 0x00]);
        assert!(matches!(classify(&frame), Disposition::StatusResponse(_)));
    }

    #[test]
    fn test_status_response_without_data() {
        let frame = inbound(FrameType::ClusterSpecific, 0x0B, vec![]);
        match classify(&frame) {
            Disposition::StatusResponse(rsp) => {
                assert!(!rsp.has_data());
                assert_eq!(rsp.outcome(), ResponseOutcome::NoData);
            }
            other => panic!("unexpected disposition {other:?}"),
        }
    }

    #[test]
    fn test_other_commands_forwarded() {
        for id in [0x00, 0x01, 0x02, 0x0A, 0x0C, 0xFF] {
            let frame = inbound(FrameType::ClusterSpecific, id, vec![]);
            assert_eq!(classify(&frame), Disposition::Forward, "command {id:#04x}");
        }
    }
}
