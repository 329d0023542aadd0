//! Inching (timed latch) command codec
//!
//! Inching makes the relay return to its previous state after a delay. The
//! command travels as an opaque buffer inside `protocolData` (0x01) and the
//! device answers later with an independent `protocolDataResponse` (0x0B).
//!
//! Payload layout:
//! ```text
//! [0x01 cmd] [0x17 inching] [0x07 length] [0x80 seq] [flags] [0x00 channel]
//! [time lo] [time hi] [0x00] [0x00] [xor checksum of bytes 0..=9]
//! ```

use crate::error::InchingError;
use crate::translate::Settings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use zcl_protocol::SendOptions;

/// Size of the encoded inching payload
pub const INCHING_PAYLOAD_LEN: usize = 11;

/// Longest representable duration: 0xFFFF half-second units
pub const MAX_INCHING_SECONDS: f64 = 32767.5;

const CMD: u8 = 0x01;
const SUBCMD_INCHING: u8 = 0x17;
const DATA_LENGTH: u8 = 0x07;
const SEQ: u8 = 0x80;

const FLAG_ENABLE: u8 = 0x80;
const FLAG_LATCH_OPEN: u8 = 0x01;

/// Status response type answering `protocolData`
pub const RESPONSE_TYPE_PROTOCOL_DATA: u8 = 0x01;
/// Status code: command executed
pub const STATUS_SUCCESS: u8 = 0x00;
/// Status code: firmware refused the command (detach mode on, incompatible switch mode)
pub const STATUS_REJECTED: u8 = 0x81;

/// Settings keys that carry the inching configuration
pub const INCHING_SETTINGS: [&str; 3] = ["inching_enabled", "inching_time", "inching_mode"];

/// Which way the relay latches during the inching period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InchingMode {
    /// Turn on, then off after the delay
    #[default]
    #[serde(alias = "on")]
    LatchOpen,
    /// Turn off, then on after the delay
    #[serde(alias = "off")]
    LatchClosed,
}

impl FromStr for InchingMode {
    type Err = InchingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latch-open" | "on" => Ok(Self::LatchOpen),
            "latch-closed" | "off" => Ok(Self::LatchClosed),
            other => Err(InchingError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for InchingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatchOpen => write!(f, "latch-open"),
            Self::LatchClosed => write!(f, "latch-closed"),
        }
    }
}

/// A validated inching request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InchingRequest {
    enabled: bool,
    time: f64,
    mode: InchingMode,
}

impl InchingRequest {
    /// Validate an inching request; `time` is in seconds
    pub fn new(enabled: bool, time: f64, mode: InchingMode) -> Result<Self, InchingError> {
        if !(0.0..=MAX_INCHING_SECONDS).contains(&time) {
            return Err(InchingError::TimeOutOfRange(time));
        }
        Ok(Self {
            enabled,
            time,
            mode,
        })
    }

    /// Build a request from host settings, applying defaults for missing keys
    /// (disabled, 1 second, latch-open)
    pub fn from_settings(settings: &Settings) -> Result<Self, InchingError> {
        let enabled = match settings.get("inching_enabled") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => return Err(InchingError::EnabledNotBoolean(other.to_string())),
        };

        let time = match settings.get("inching_time") {
            None | Some(Value::Null) => 1.0,
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| InchingError::TimeNotNumber(n.to_string()))?,
            Some(other) => return Err(InchingError::TimeNotNumber(other.to_string())),
        };

        let mode = match settings.get("inching_mode") {
            None | Some(Value::Null) => InchingMode::default(),
            Some(Value::String(s)) => s.parse()?,
            Some(other) => return Err(InchingError::InvalidMode(other.to_string())),
        };

        Self::new(enabled, time, mode)
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Duration in seconds
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[must_use]
    pub fn mode(&self) -> InchingMode {
        self.mode
    }

    /// Duration in half-second units; never zero
    #[must_use]
    pub fn time_units(&self) -> u16 {
        let ms = (self.time * 1000.0).round();
        let units = (ms / 500.0).round();
        units.clamp(1.0, f64::from(u16::MAX)) as u16
    }

    /// Encode the 11-byte payload
    #[must_use]
    pub fn encode(&self) -> InchingPayload {
        let mut flags = 0x00;
        if self.enabled {
            flags |= FLAG_ENABLE;
        }
        if self.mode == InchingMode::LatchOpen {
            flags |= FLAG_LATCH_OPEN;
        }

        let [time_lo, time_hi] = self.time_units().to_le_bytes();
        let mut bytes = [
            CMD,
            SUBCMD_INCHING,
            DATA_LENGTH,
            SEQ,
            flags,
            0x00, // channel
            time_lo,
            time_hi,
            0x00,
            0x00,
            0x00,
        ];
        bytes[INCHING_PAYLOAD_LEN - 1] = InchingPayload::checksum_of(&bytes);
        InchingPayload(bytes)
    }

    /// Payload together with how it has to be sent
    #[must_use]
    pub fn command(&self) -> InchingCommand {
        InchingCommand {
            payload: self.encode(),
            options: SendOptions::fire_and_forget(),
        }
    }
}

/// Encoded inching payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InchingPayload([u8; INCHING_PAYLOAD_LEN]);

impl InchingPayload {
    /// XOR over the header and data bytes (`length + 3` bytes)
    #[must_use]
    pub fn checksum_of(bytes: &[u8; INCHING_PAYLOAD_LEN]) -> u8 {
        let covered = usize::from(bytes[2]) + 3;
        bytes[..covered.min(INCHING_PAYLOAD_LEN - 1)]
            .iter()
            .fold(0, |acc, b| acc ^ b)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; INCHING_PAYLOAD_LEN] {
        &self.0
    }

    #[must_use]
    pub fn flags(&self) -> u8 {
        self.0[4]
    }

    #[must_use]
    pub fn time_units(&self) -> u16 {
        u16::from_le_bytes([self.0[6], self.0[7]])
    }

    #[must_use]
    pub fn checksum(&self) -> u8 {
        self.0[INCHING_PAYLOAD_LEN - 1]
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.checksum() == Self::checksum_of(&self.0)
    }
}

/// Inching payload paired with its delivery options. The manufacturer code
/// comes from the cluster the command is sent on.
#[derive(Debug, Clone, Copy)]
pub struct InchingCommand {
    pub payload: InchingPayload,
    pub options: SendOptions,
}

/// Payload of a `protocolDataResponse` frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    /// Response type (byte 0), `None` when the frame carried no data
    pub response_type: Option<u8>,
    /// Status code (byte 1), if present
    pub code: Option<u8>,
    pub raw: Vec<u8>,
}

impl StatusResponse {
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        Self {
            response_type: payload.first().copied(),
            code: payload.get(1).copied(),
            raw: payload.to_vec(),
        }
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.response_type.is_some()
    }

    /// Interpret the response
    #[must_use]
    pub fn outcome(&self) -> ResponseOutcome {
        match self.response_type {
            None => ResponseOutcome::NoData,
            Some(RESPONSE_TYPE_PROTOCOL_DATA) => match self.code {
                Some(STATUS_SUCCESS) => ResponseOutcome::Success,
                Some(STATUS_REJECTED) => ResponseOutcome::Rejected,
                code => ResponseOutcome::Failed { code },
            },
            Some(other) => ResponseOutcome::UnknownType(other),
        }
    }
}

/// Classification of a status response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Inching command executed
    Success,
    /// Firmware refused the command; expected when preconditions are not met
    Rejected,
    /// Any other status code
    Failed { code: Option<u8> },
    /// Response type not characterized yet
    UnknownType(u8),
    /// Frame carried no payload
    NoData,
}

impl ResponseOutcome {
    /// Only genuine failures count as errors
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(enabled: bool, time: f64, mode: InchingMode) -> InchingRequest {
        InchingRequest::new(enabled, time, mode).unwrap()
    }

    #[test]
    fn test_payload_layout() {
        let payload = request(true, 1.0, InchingMode::LatchOpen).encode();
        let bytes = payload.as_bytes();
        assert_eq!(bytes.len(), INCHING_PAYLOAD_LEN);
        assert_eq!(
            &bytes[..10],
            &[0x01, 0x17, 0x07, 0x80, 0x81, 0x00, 0x02, 0x00, 0x00, 0x00]
        );
        let xor = bytes[..10].iter().fold(0u8, |acc, b| acc ^ b);
        assert_eq!(bytes[10], xor);
        assert!(payload.is_valid());
    }

    #[test]
    fn test_checksum_holds_across_inputs() {
        for time in [0.0, 0.25, 0.5, 1.0, 7.3, 600.0, 12345.6, MAX_INCHING_SECONDS] {
            for enabled in [true, false] {
                for mode in [InchingMode::LatchOpen, InchingMode::LatchClosed] {
                    let payload = request(enabled, time, mode).encode();
                    let bytes = payload.as_bytes();
                    let xor = bytes[..10].iter().fold(0u8, |acc, b| acc ^ b);
                    assert_eq!(bytes[10], xor, "time={time} enabled={enabled}");
                }
            }
        }
    }

    #[test]
    fn test_time_quantization() {
        assert_eq!(request(true, 1.0, InchingMode::LatchOpen).time_units(), 2);
        assert_eq!(request(true, 0.5, InchingMode::LatchOpen).time_units(), 1);
        assert_eq!(request(true, 0.0, InchingMode::LatchOpen).time_units(), 1);
        assert_eq!(request(true, 0.2, InchingMode::LatchOpen).time_units(), 1);
        assert_eq!(request(true, 2.75, InchingMode::LatchOpen).time_units(), 6);
        assert_eq!(
            request(true, MAX_INCHING_SECONDS, InchingMode::LatchOpen).time_units(),
            0xFFFF
        );

        let payload = request(true, 300.0, InchingMode::LatchOpen).encode();
        assert_eq!(payload.time_units(), 600);
        assert_eq!(&payload.as_bytes()[6..8], &[0x58, 0x02]);
    }

    #[test]
    fn test_time_out_of_range() {
        assert_eq!(
            InchingRequest::new(true, 40000.0, InchingMode::LatchOpen),
            Err(InchingError::TimeOutOfRange(40000.0))
        );
        assert!(InchingRequest::new(true, -0.5, InchingMode::LatchOpen).is_err());
        assert!(InchingRequest::new(true, f64::NAN, InchingMode::LatchOpen).is_err());
    }

    #[test]
    fn test_flags() {
        let flags = |enabled, mode| request(enabled, 1.0, mode).encode().flags();
        assert_eq!(flags(true, InchingMode::LatchClosed), 0x80);
        assert_eq!(flags(true, InchingMode::LatchOpen), 0x81);
        assert_eq!(flags(false, InchingMode::LatchOpen), 0x01);
        assert_eq!(flags(false, InchingMode::LatchClosed), 0x00);
    }

    #[test]
    fn test_command_is_fire_and_forget() {
        let cmd = request(true, 1.0, InchingMode::LatchOpen).command();
        assert_eq!(InchingMode::default(), InchingMode::LatchOpen);
        assert!(!cmd.options.wait_for_response);
        assert!(!cmd.options.expect_default_response);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("latch-open".parse::<InchingMode>(), Ok(InchingMode::LatchOpen));
        assert_eq!("off".parse::<InchingMode>(), Ok(InchingMode::LatchClosed));
        assert_eq!(
            "sideways".parse::<InchingMode>(),
            Err(InchingError::InvalidMode("sideways".to_string()))
        );
        let mode: InchingMode = serde_json::from_value(json!("on")).unwrap();
        assert_eq!(mode, InchingMode::LatchOpen);
    }

    #[test]
    fn test_from_settings() {
        let settings = json!({
            "inching_enabled": true,
            "inching_time": 2.5,
            "inching_mode": "latch-closed",
            "TurboMode": true,
        });
        let req = InchingRequest::from_settings(settings.as_object().unwrap()).unwrap();
        assert!(req.enabled());
        assert_eq!(req.time_units(), 5);
        assert_eq!(req.mode(), InchingMode::LatchClosed);

        let defaults = InchingRequest::from_settings(&Settings::new()).unwrap();
        assert!(!defaults.enabled());
        assert_eq!(defaults.time_units(), 2);
        assert_eq!(defaults.mode(), InchingMode::LatchOpen);
    }

    #[test]
    fn test_from_settings_type_errors() {
        let bad_enabled = json!({ "inching_enabled": "yes" });
        assert!(matches!(
            InchingRequest::from_settings(bad_enabled.as_object().unwrap()),
            Err(InchingError::EnabledNotBoolean(_))
        ));

        let bad_time = json!({ "inching_enabled": true, "inching_time": "10" });
        assert!(matches!(
            InchingRequest::from_settings(bad_time.as_object().unwrap()),
            Err(InchingError::TimeNotNumber(_))
        ));

        let bad_mode = json!({ "inching_enabled": true, "inching_mode": 1 });
        assert!(matches!(
            InchingRequest::from_settings(bad_mode.as_object().unwrap()),
            Err(InchingError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_status_interpretation() {
        let outcome = |payload: &[u8]| StatusResponse::from_payload(payload).outcome();
        assert_eq!(outcome(&[0x01, 0x00]), ResponseOutcome::Success);
        assert_eq!(outcome(&[0x01, 0x81]), ResponseOutcome::Rejected);
        assert!(!outcome(&[0x01, 0x81]).is_error());
        assert_eq!(
            outcome(&[0x01, 0x42]),
            ResponseOutcome::Failed { code: Some(0x42) }
        );
        assert!(outcome(&[0x01, 0x42]).is_error());
        assert_eq!(outcome(&[0x01]), ResponseOutcome::Failed { code: None });
        assert_eq!(outcome(&[0x02, 0x00]), ResponseOutcome::UnknownType(0x02));
        assert!(!outcome(&[0x02, 0x55]).is_error());
        assert_eq!(outcome(&[]), ResponseOutcome::NoData);
    }
}
