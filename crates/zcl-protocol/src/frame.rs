//! ZCL frame header and payload

use crate::types::{GlobalCommand, ProtocolError};

/// Frame control: frame type mask (bits 0-1)
const FC_FRAME_TYPE_MASK: u8 = 0x03;
/// Frame control: manufacturer-specific flag (bit 2)
const FC_MANUFACTURER_SPECIFIC: u8 = 0x04;
/// Frame control: direction flag (bit 3), set for server to client
const FC_SERVER_TO_CLIENT: u8 = 0x08;
/// Frame control: disable default response (bit 4)
const FC_DISABLE_DEFAULT_RESPONSE: u8 = 0x10;

/// ZCL frame types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Global = 0x00,
    ClusterSpecific = 0x01,
}

/// ZCL direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    ClientToServer = 0x00,
    ServerToClient = 0x01,
}

/// ZCL frame (Zigbee Cluster Library)
///
/// Frame format:
/// ```text
/// [Frame Control: 1 byte]
/// [Manufacturer Code: 2 bytes LE] (only if bit 2 of frame control is set)
/// [Transaction Sequence: 1 byte]
/// [Command ID: 1 byte]
/// [Payload: variable]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZclFrame {
    frame_control: u8,
    manufacturer_code: Option<u16>,
    transaction_seq: u8,
    command_id: u8,
    payload: Vec<u8>,
}

impl ZclFrame {
    /// Create a frame from its header fields
    #[must_use]
    pub fn new(
        frame_type: FrameType,
        direction: Direction,
        manufacturer_code: Option<u16>,
        transaction_seq: u8,
        command_id: u8,
        payload: Vec<u8>,
    ) -> Self {
        let mut frame_control = frame_type as u8;
        if manufacturer_code.is_some() {
            frame_control |= FC_MANUFACTURER_SPECIFIC;
        }
        if direction == Direction::ServerToClient {
            frame_control |= FC_SERVER_TO_CLIENT;
        }
        Self {
            frame_control,
            manufacturer_code,
            transaction_seq,
            command_id,
            payload,
        }
    }

    /// Create a global command frame (client to server)
    #[must_use]
    pub fn global(
        manufacturer_code: Option<u16>,
        transaction_seq: u8,
        command: GlobalCommand,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(
            FrameType::Global,
            Direction::ClientToServer,
            manufacturer_code,
            transaction_seq,
            command as u8,
            payload,
        )
    }

    /// Create a cluster-specific command frame (client to server)
    #[must_use]
    pub fn cluster_command(
        manufacturer_code: Option<u16>,
        transaction_seq: u8,
        command_id: u8,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(
            FrameType::ClusterSpecific,
            Direction::ClientToServer,
            manufacturer_code,
            transaction_seq,
            command_id,
            payload,
        )
    }

    /// Set or clear the disable-default-response flag
    #[must_use]
    pub fn with_disable_default_response(mut self, disable: bool) -> Self {
        if disable {
            self.frame_control |= FC_DISABLE_DEFAULT_RESPONSE;
        } else {
            self.frame_control &= !FC_DISABLE_DEFAULT_RESPONSE;
        }
        self
    }

    /// Parse a ZCL frame from raw ASDU bytes
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < 3 {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let frame_control = data[0];
        let mut idx = 1;

        let manufacturer_code = if (frame_control & FC_MANUFACTURER_SPECIFIC) != 0 {
            if data.len() < idx + 2 {
                return Err(ProtocolError::FrameTooShort(data.len()));
            }
            let code = u16::from_le_bytes([data[idx], data[idx + 1]]);
            idx += 2;
            Some(code)
        } else {
            None
        };

        if data.len() < idx + 2 {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let transaction_seq = data[idx];
        idx += 1;
        let command_id = data[idx];
        idx += 1;

        Ok(Self {
            frame_control,
            manufacturer_code,
            transaction_seq,
            command_id,
            payload: data[idx..].to_vec(),
        })
    }

    /// Serialize to bytes
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(5 + self.payload.len());
        data.push(self.frame_control);
        if let Some(mfr) = self.manufacturer_code {
            data.extend_from_slice(&mfr.to_le_bytes());
        }
        data.push(self.transaction_seq);
        data.push(self.command_id);
        data.extend_from_slice(&self.payload);
        data
    }

    /// Get frame control byte
    #[must_use]
    pub fn frame_control(&self) -> u8 {
        self.frame_control
    }

    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        if (self.frame_control & FC_FRAME_TYPE_MASK) == FrameType::ClusterSpecific as u8 {
            FrameType::ClusterSpecific
        } else {
            FrameType::Global
        }
    }

    /// Check if this is a cluster-specific command (vs global)
    #[must_use]
    pub fn is_cluster_specific(&self) -> bool {
        self.frame_type() == FrameType::ClusterSpecific
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        if (self.frame_control & FC_SERVER_TO_CLIENT) != 0 {
            Direction::ServerToClient
        } else {
            Direction::ClientToServer
        }
    }

    /// Check if this is from server to client (vs client to server)
    #[must_use]
    pub fn is_from_server(&self) -> bool {
        self.direction() == Direction::ServerToClient
    }

    #[must_use]
    pub fn disable_default_response(&self) -> bool {
        (self.frame_control & FC_DISABLE_DEFAULT_RESPONSE) != 0
    }

    #[must_use]
    pub fn manufacturer_code(&self) -> Option<u16> {
        self.manufacturer_code
    }

    #[must_use]
    pub fn transaction_seq(&self) -> u8 {
        self.transaction_seq
    }

    /// Get the command ID
    #[must_use]
    pub fn command_id(&self) -> u8 {
        self.command_id
    }

    /// Global command carried by this frame, if it is a global frame
    #[must_use]
    pub fn global_command(&self) -> Option<GlobalCommand> {
        if self.is_cluster_specific() {
            return None;
        }
        GlobalCommand::from_u8(self.command_id)
    }

    /// Get the payload
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Hex dump of the serialized frame, for logging
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manufacturer_specific_header() {
        let frame = ZclFrame::cluster_command(Some(0x1286), 7, 0x01, vec![0xAA])
            .with_disable_default_response(true);
        assert_eq!(
            frame.serialize(),
            vec![0x15, 0x86, 0x12, 0x07, 0x01, 0xAA]
        );
    }

    #[test]
    fn test_parse_global_frame() {
        let frame = ZclFrame::parse(&[0x18, 0x2A, 0x04, 0x00]).unwrap();
        assert_eq!(frame.frame_type(), FrameType::Global);
        assert!(frame.is_from_server());
        assert!(frame.disable_default_response());
        assert_eq!(frame.manufacturer_code(), None);
        assert_eq!(frame.transaction_seq(), 0x2A);
        assert_eq!(
            frame.global_command(),
            Some(GlobalCommand::WriteAttributesResponse)
        );
        assert_eq!(frame.payload(), &[0x00]);
    }

    #[test]
    fn test_parse_manufacturer_frame() {
        let bytes = [0x1D, 0x86, 0x12, 0x03, 0x0B, 0x01, 0x00];
        let frame = ZclFrame::parse(&bytes).unwrap();
        assert!(frame.is_cluster_specific());
        assert_eq!(frame.manufacturer_code(), Some(0x1286));
        assert_eq!(frame.command_id(), 0x0B);
        assert_eq!(frame.global_command(), None);
        assert_eq!(frame.serialize(), bytes.to_vec());
    }

    #[test]
    fn test_frame_too_short() {
        assert!(matches!(
            ZclFrame::parse(&[0x04, 0x86]),
            Err(ProtocolError::FrameTooShort(2))
        ));
        assert!(matches!(
            ZclFrame::parse(&[0x04, 0x86, 0x12, 0x01]),
            Err(ProtocolError::FrameTooShort(4))
        ));
    }
}
