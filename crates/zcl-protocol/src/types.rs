//! Common types used throughout the protocol

use thiserror::Error;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Frame too short: {0} bytes")]
    FrameTooShort(usize),

    #[error("Unknown data type: {0:#04X}")]
    UnknownDataType(u8),

    #[error("Value does not fit data type {data_type:?}: {value}")]
    ValueOutOfRange { data_type: DataType, value: String },

    #[error("Unexpected response command {actual:#04X}, expected {expected:#04X}")]
    UnexpectedResponse { expected: u8, actual: u8 },

    #[error("No response received")]
    NoResponse,

    #[error("Request timeout")]
    Timeout,

    #[error("Transport not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Device returned error status: {0:?}")]
    DeviceError(Status),
}

/// ZCL status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    Failure = 0x01,
    NotAuthorized = 0x7E,
    MalformedCommand = 0x80,
    UnsupClusterCommand = 0x81,
    UnsupGeneralCommand = 0x82,
    UnsupManufClusterCommand = 0x83,
    UnsupManufGeneralCommand = 0x84,
    InvalidField = 0x85,
    UnsupportedAttribute = 0x86,
    InvalidValue = 0x87,
    ReadOnly = 0x88,
    InsufficientSpace = 0x89,
    NotFound = 0x8B,
    UnreportableAttribute = 0x8C,
    InvalidDataType = 0x8D,
    Timeout = 0x94,
}

impl TryFrom<u8> for Status {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0x00 => Ok(Status::Success),
            0x01 => Ok(Status::Failure),
            0x7E => Ok(Status::NotAuthorized),
            0x80 => Ok(Status::MalformedCommand),
            0x81 => Ok(Status::UnsupClusterCommand),
            0x82 => Ok(Status::UnsupGeneralCommand),
            0x83 => Ok(Status::UnsupManufClusterCommand),
            0x84 => Ok(Status::UnsupManufGeneralCommand),
            0x85 => Ok(Status::InvalidField),
            0x86 => Ok(Status::UnsupportedAttribute),
            0x87 => Ok(Status::InvalidValue),
            0x88 => Ok(Status::ReadOnly),
            0x89 => Ok(Status::InsufficientSpace),
            0x8B => Ok(Status::NotFound),
            0x8C => Ok(Status::UnreportableAttribute),
            0x8D => Ok(Status::InvalidDataType),
            0x94 => Ok(Status::Timeout),
            _ => Err(value),
        }
    }
}

impl Status {
    /// Decode a status byte, mapping unknown codes to `Failure`
    #[must_use]
    pub fn from_byte(value: u8) -> Self {
        Self::try_from(value).unwrap_or(Status::Failure)
    }
}

/// ZCL global (profile-wide) commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GlobalCommand {
    ReadAttributes = 0x00,
    ReadAttributesResponse = 0x01,
    WriteAttributes = 0x02,
    WriteAttributesUndivided = 0x03,
    WriteAttributesResponse = 0x04,
    WriteAttributesNoResponse = 0x05,
    ConfigureReporting = 0x06,
    ConfigureReportingResponse = 0x07,
    ReadReportingConfig = 0x08,
    ReadReportingConfigResponse = 0x09,
    ReportAttributes = 0x0A,
    DefaultResponse = 0x0B,
    DiscoverAttributes = 0x0C,
    DiscoverAttributesResponse = 0x0D,
}

impl GlobalCommand {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::ReadAttributes),
            0x01 => Some(Self::ReadAttributesResponse),
            0x02 => Some(Self::WriteAttributes),
            0x03 => Some(Self::WriteAttributesUndivided),
            0x04 => Some(Self::WriteAttributesResponse),
            0x05 => Some(Self::WriteAttributesNoResponse),
            0x06 => Some(Self::ConfigureReporting),
            0x07 => Some(Self::ConfigureReportingResponse),
            0x08 => Some(Self::ReadReportingConfig),
            0x09 => Some(Self::ReadReportingConfigResponse),
            0x0A => Some(Self::ReportAttributes),
            0x0B => Some(Self::DefaultResponse),
            0x0C => Some(Self::DiscoverAttributes),
            0x0D => Some(Self::DiscoverAttributesResponse),
            _ => None,
        }
    }
}

/// ZCL data types used by the supported clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    NoData = 0x00,
    Boolean = 0x10,
    Bitmap8 = 0x18,
    Uint8 = 0x20,
    Uint16 = 0x21,
    Uint32 = 0x23,
    Int8 = 0x28,
    Int16 = 0x29,
    Int32 = 0x2B,
    Enum8 = 0x30,
    OctetString = 0x41,
    CharString = 0x42,
}

impl TryFrom<u8> for DataType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0x00 => Ok(DataType::NoData),
            0x10 => Ok(DataType::Boolean),
            0x18 => Ok(DataType::Bitmap8),
            0x20 => Ok(DataType::Uint8),
            0x21 => Ok(DataType::Uint16),
            0x23 => Ok(DataType::Uint32),
            0x28 => Ok(DataType::Int8),
            0x29 => Ok(DataType::Int16),
            0x2B => Ok(DataType::Int32),
            0x30 => Ok(DataType::Enum8),
            0x41 => Ok(DataType::OctetString),
            0x42 => Ok(DataType::CharString),
            v => Err(ProtocolError::UnknownDataType(v)),
        }
    }
}

impl DataType {
    /// Analog types carry a reportable change field in reporting configurations
    #[must_use]
    pub fn is_analog(self) -> bool {
        matches!(
            self,
            DataType::Uint8
                | DataType::Uint16
                | DataType::Uint32
                | DataType::Int8
                | DataType::Int16
                | DataType::Int32
        )
    }
}

/// ZCL profile IDs
pub mod profiles {
    pub const HOME_AUTOMATION: u16 = 0x0104;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_maps_to_failure() {
        assert_eq!(Status::from_byte(0x00), Status::Success);
        assert_eq!(Status::from_byte(0x86), Status::UnsupportedAttribute);
        assert_eq!(Status::from_byte(0x42), Status::Failure);
    }

    #[test]
    fn test_data_type_lookup() {
        assert_eq!(DataType::try_from(0x29).unwrap(), DataType::Int16);
        assert!(matches!(
            DataType::try_from(0xF0),
            Err(ProtocolError::UnknownDataType(0xF0))
        ));
    }
}
