//! Attribute values and global attribute command payloads

use crate::types::{DataType, ProtocolError, Status};
use std::fmt;

/// A typed attribute value as it appears on the wire
#[derive(Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Bool(bool),
    Bitmap8(u8),
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
    Enum8(u8),
    Octets(Vec<u8>),
    String(String),
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(val) => write!(f, "bool:{val}"),
            Self::Bitmap8(val) => write!(f, "b8:{val:02X}"),
            Self::U8(val) => write!(f, "u8:{val}"),
            Self::U16(val) => write!(f, "u16:{val}"),
            Self::U32(val) => write!(f, "u32:{val}"),
            Self::I8(val) => write!(f, "i8:{val}"),
            Self::I16(val) => write!(f, "i16:{val}"),
            Self::I32(val) => write!(f, "i32:{val}"),
            Self::Enum8(val) => write!(f, "e8:{val:02X}"),
            Self::Octets(val) => write!(f, "hex:{}", hex::encode(val)),
            Self::String(val) => write!(f, "str:{val}"),
        }
    }
}

impl AttributeValue {
    /// Wire data type of this value
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Boolean,
            Self::Bitmap8(_) => DataType::Bitmap8,
            Self::U8(_) => DataType::Uint8,
            Self::U16(_) => DataType::Uint16,
            Self::U32(_) => DataType::Uint32,
            Self::I8(_) => DataType::Int8,
            Self::I16(_) => DataType::Int16,
            Self::I32(_) => DataType::Int32,
            Self::Enum8(_) => DataType::Enum8,
            Self::Octets(_) => DataType::OctetString,
            Self::String(_) => DataType::CharString,
        }
    }

    /// Build a numeric value of the given type, checking that it fits
    pub fn from_i64(data_type: DataType, value: i64) -> Result<Self, ProtocolError> {
        let out_of_range = || ProtocolError::ValueOutOfRange {
            data_type,
            value: value.to_string(),
        };
        let v = match data_type {
            DataType::Boolean => match value {
                0 => Self::Bool(false),
                1 => Self::Bool(true),
                _ => return Err(out_of_range()),
            },
            DataType::Bitmap8 => Self::Bitmap8(u8::try_from(value).map_err(|_| out_of_range())?),
            DataType::Uint8 => Self::U8(u8::try_from(value).map_err(|_| out_of_range())?),
            DataType::Uint16 => Self::U16(u16::try_from(value).map_err(|_| out_of_range())?),
            DataType::Uint32 => Self::U32(u32::try_from(value).map_err(|_| out_of_range())?),
            DataType::Int8 => Self::I8(i8::try_from(value).map_err(|_| out_of_range())?),
            DataType::Int16 => Self::I16(i16::try_from(value).map_err(|_| out_of_range())?),
            DataType::Int32 => Self::I32(i32::try_from(value).map_err(|_| out_of_range())?),
            DataType::Enum8 => Self::Enum8(u8::try_from(value).map_err(|_| out_of_range())?),
            DataType::NoData | DataType::OctetString | DataType::CharString => {
                return Err(out_of_range())
            }
        };
        Ok(v)
    }

    /// Numeric view of the value (booleans map to 0/1)
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Bool(v) => Some(i64::from(*v)),
            Self::Bitmap8(v) | Self::U8(v) | Self::Enum8(v) => Some(i64::from(*v)),
            Self::U16(v) => Some(i64::from(*v)),
            Self::U32(v) => Some(i64::from(*v)),
            Self::I8(v) => Some(i64::from(*v)),
            Self::I16(v) => Some(i64::from(*v)),
            Self::I32(v) => Some(i64::from(*v)),
            Self::Octets(_) | Self::String(_) => None,
        }
    }

    /// Append the encoded value (without type byte) to `out`
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        match self {
            Self::Bool(v) => out.push(u8::from(*v)),
            Self::Bitmap8(v) | Self::U8(v) | Self::Enum8(v) => out.push(*v),
            Self::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I8(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Octets(v) => {
                let len = u8::try_from(v.len()).map_err(|_| ProtocolError::ValueOutOfRange {
                    data_type: DataType::OctetString,
                    value: format!("{} bytes", v.len()),
                })?;
                out.push(len);
                out.extend_from_slice(v);
            }
            Self::String(v) => {
                let len = u8::try_from(v.len()).map_err(|_| ProtocolError::ValueOutOfRange {
                    data_type: DataType::CharString,
                    value: format!("{} bytes", v.len()),
                })?;
                out.push(len);
                out.extend_from_slice(v.as_bytes());
            }
        }
        Ok(())
    }

    fn decode(data_type: DataType, rdr: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        let value = match data_type {
            DataType::NoData => {
                return Err(ProtocolError::InvalidFrame(
                    "Attribute with no-data type".to_string(),
                ))
            }
            DataType::Boolean => Self::Bool(rdr.u8()? != 0),
            DataType::Bitmap8 => Self::Bitmap8(rdr.u8()?),
            DataType::Uint8 => Self::U8(rdr.u8()?),
            DataType::Uint16 => Self::U16(u16::from_le_bytes(rdr.array()?)),
            DataType::Uint32 => Self::U32(u32::from_le_bytes(rdr.array()?)),
            DataType::Int8 => Self::I8(i8::from_le_bytes(rdr.array()?)),
            DataType::Int16 => Self::I16(i16::from_le_bytes(rdr.array()?)),
            DataType::Int32 => Self::I32(i32::from_le_bytes(rdr.array()?)),
            DataType::Enum8 => Self::Enum8(rdr.u8()?),
            DataType::OctetString => {
                let len = rdr.u8()? as usize;
                Self::Octets(rdr.take(len)?.to_vec())
            }
            DataType::CharString => {
                let len = rdr.u8()? as usize;
                let raw = rdr.take(len)?;
                Self::String(String::from_utf8_lossy(raw).into_owned())
            }
        };
        Ok(value)
    }
}

/// Bounds-checked cursor over a payload
struct Reader<'a> {
    data: &'a [u8],
    idx: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, idx: 0 }
    }

    fn is_empty(&self) -> bool {
        self.idx >= self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if self.data.len() < self.idx + len {
            return Err(ProtocolError::FrameTooShort(self.data.len()));
        }
        let slice = &self.data[self.idx..self.idx + len];
        self.idx += len;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }
}

/// Attribute id with its decoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    pub id: u16,
    pub value: AttributeValue,
}

/// Attribute id with a non-success status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeStatus {
    pub id: u16,
    pub status: Status,
}

/// Build a Read Attributes payload: list of attribute ids (u16 LE)
#[must_use]
pub fn read_attributes_payload(ids: &[u16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(ids.len() * 2);
    for id in ids {
        data.extend_from_slice(&id.to_le_bytes());
    }
    data
}

/// Build a Write Attributes payload: id (u16 LE), data type, value per record
pub fn write_attributes_payload(records: &[AttributeRecord]) -> Result<Vec<u8>, ProtocolError> {
    let mut data = Vec::new();
    for record in records {
        data.extend_from_slice(&record.id.to_le_bytes());
        data.push(record.value.data_type() as u8);
        record.value.encode(&mut data)?;
    }
    Ok(data)
}

/// Parse a Report Attributes payload: id, data type, value per record
pub fn parse_report_attributes(payload: &[u8]) -> Result<Vec<AttributeRecord>, ProtocolError> {
    let mut rdr = Reader::new(payload);
    let mut records = Vec::new();
    while !rdr.is_empty() {
        let id = rdr.u16()?;
        let data_type = DataType::try_from(rdr.u8()?)?;
        let value = AttributeValue::decode(data_type, &mut rdr)?;
        records.push(AttributeRecord { id, value });
    }
    Ok(records)
}

/// One attribute reporting configuration (server to client direction)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingConfig {
    pub attribute_id: u16,
    pub data_type: DataType,
    /// Seconds
    pub min_interval: u16,
    /// Seconds
    pub max_interval: u16,
    /// Only encoded for analog data types
    pub reportable_change: Option<AttributeValue>,
}

/// Build a Configure Reporting payload: direction, id, data type, min and max
/// interval, then the reportable change for analog types
pub fn configure_reporting_payload(configs: &[ReportingConfig]) -> Result<Vec<u8>, ProtocolError> {
    let mut data = Vec::with_capacity(configs.len() * 8);
    for config in configs {
        data.push(0x00);
        data.extend_from_slice(&config.attribute_id.to_le_bytes());
        data.push(config.data_type as u8);
        data.extend_from_slice(&config.min_interval.to_le_bytes());
        data.extend_from_slice(&config.max_interval.to_le_bytes());
        if config.data_type.is_analog() {
            match &config.reportable_change {
                Some(change) if change.data_type() == config.data_type => change.encode(&mut data)?,
                Some(change) => {
                    return Err(ProtocolError::ValueOutOfRange {
                        data_type: config.data_type,
                        value: format!("{change:?}"),
                    })
                }
                None => AttributeValue::from_i64(config.data_type, 0)?.encode(&mut data)?,
            }
        }
    }
    Ok(data)
}

/// Configure Reporting Response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigureReportingResponse {
    pub failures: Vec<AttributeStatus>,
}

impl ConfigureReportingResponse {
    /// Parse either a lone success status or (status, direction, id) records
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::FrameTooShort(0));
        }
        if payload == [Status::Success as u8] {
            return Ok(Self::default());
        }

        let mut rdr = Reader::new(payload);
        let mut failures = Vec::new();
        while !rdr.is_empty() {
            let status = Status::from_byte(rdr.u8()?);
            let _direction = rdr.u8()?;
            let id = rdr.u16()?;
            if status != Status::Success {
                failures.push(AttributeStatus { id, status });
            }
        }
        Ok(Self { failures })
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read Attributes Response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadAttributesResponse {
    pub values: Vec<AttributeRecord>,
    pub failures: Vec<AttributeStatus>,
}

impl ReadAttributesResponse {
    /// Parse records of: id, status, then (on success) data type and value
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut rdr = Reader::new(payload);
        let mut response = Self::default();
        while !rdr.is_empty() {
            let id = rdr.u16()?;
            let status = Status::from_byte(rdr.u8()?);
            if status != Status::Success {
                response.failures.push(AttributeStatus { id, status });
                continue;
            }
            let data_type = DataType::try_from(rdr.u8()?)?;
            let value = AttributeValue::decode(data_type, &mut rdr)?;
            response.values.push(AttributeRecord { id, value });
        }
        Ok(response)
    }

    /// Serialize back to wire form
    pub fn serialize(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut data = Vec::new();
        for record in &self.values {
            data.extend_from_slice(&record.id.to_le_bytes());
            data.push(Status::Success as u8);
            data.push(record.value.data_type() as u8);
            record.value.encode(&mut data)?;
        }
        for failure in &self.failures {
            data.extend_from_slice(&failure.id.to_le_bytes());
            data.push(failure.status as u8);
        }
        Ok(data)
    }
}

/// Write Attributes Response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteAttributesResponse {
    pub failures: Vec<AttributeStatus>,
}

impl WriteAttributesResponse {
    /// Parse either a lone success status or a list of (status, id) records
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::FrameTooShort(0));
        }
        if payload == [Status::Success as u8] {
            return Ok(Self::default());
        }

        let mut rdr = Reader::new(payload);
        let mut failures = Vec::new();
        while !rdr.is_empty() {
            let status = Status::from_byte(rdr.u8()?);
            let id = rdr.u16()?;
            if status != Status::Success {
                failures.push(AttributeStatus { id, status });
            }
        }
        Ok(Self { failures })
    }

    /// Serialize back to wire form
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        if self.failures.is_empty() {
            return vec![Status::Success as u8];
        }
        let mut data = Vec::with_capacity(self.failures.len() * 3);
        for failure in &self.failures {
            data.push(failure.status as u8);
            data.extend_from_slice(&failure.id.to_le_bytes());
        }
        data
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_payload_layout() {
        let payload = write_attributes_payload(&[
            AttributeRecord {
                id: 0x0012,
                value: AttributeValue::I16(20),
            },
            AttributeRecord {
                id: 0x0017,
                value: AttributeValue::Bool(true),
            },
        ])
        .unwrap();
        assert_eq!(
            payload,
            vec![0x12, 0x00, 0x29, 0x14, 0x00, 0x17, 0x00, 0x10, 0x01]
        );
    }

    #[test]
    fn test_read_response_with_unsupported_attribute() {
        let payload = [
            0x16, 0x00, 0x00, 0x20, 0x02, // switch_mode = 2
            0x02, 0x00, 0x86, // backlight unsupported
            0x12, 0x00, 0x00, 0x29, 0x09, 0x00, // TurboMode = 9
        ];
        let resp = ReadAttributesResponse::parse(&payload).unwrap();
        assert_eq!(
            resp.values,
            vec![
                AttributeRecord {
                    id: 0x0016,
                    value: AttributeValue::U8(2)
                },
                AttributeRecord {
                    id: 0x0012,
                    value: AttributeValue::I16(9)
                },
            ]
        );
        assert_eq!(
            resp.failures,
            vec![AttributeStatus {
                id: 0x0002,
                status: Status::UnsupportedAttribute
            }]
        );
    }

    #[test]
    fn test_read_response_truncated_value() {
        let payload = [0x12, 0x00, 0x00, 0x29, 0x09];
        assert!(matches!(
            ReadAttributesResponse::parse(&payload),
            Err(ProtocolError::FrameTooShort(_))
        ));
    }

    #[test]
    fn test_write_response_forms() {
        assert!(WriteAttributesResponse::parse(&[0x00]).unwrap().is_success());

        let resp = WriteAttributesResponse::parse(&[0x88, 0x16, 0x00]).unwrap();
        assert_eq!(
            resp.failures,
            vec![AttributeStatus {
                id: 0x0016,
                status: Status::ReadOnly
            }]
        );
        assert_eq!(resp.serialize(), vec![0x88, 0x16, 0x00]);
    }

    #[test]
    fn test_from_i64_range_check() {
        assert_eq!(
            AttributeValue::from_i64(DataType::Uint8, 130).unwrap(),
            AttributeValue::U8(130)
        );
        assert!(AttributeValue::from_i64(DataType::Uint8, 256).is_err());
        assert!(AttributeValue::from_i64(DataType::Boolean, 2).is_err());
        assert_eq!(
            AttributeValue::from_i64(DataType::Int16, -5).unwrap(),
            AttributeValue::I16(-5)
        );
    }

    #[test]
    fn test_configure_reporting_payload() {
        let discrete = ReportingConfig {
            attribute_id: 0x0000,
            data_type: DataType::Boolean,
            min_interval: 1,
            max_interval: 3600,
            reportable_change: Some(AttributeValue::Bool(true)),
        };
        assert_eq!(
            configure_reporting_payload(&[discrete]).unwrap(),
            vec![0x00, 0x00, 0x00, 0x10, 0x01, 0x00, 0x10, 0x0E]
        );

        let analog = ReportingConfig {
            attribute_id: 0x0015,
            data_type: DataType::Uint16,
            min_interval: 0,
            max_interval: 60,
            reportable_change: Some(AttributeValue::U16(5)),
        };
        assert_eq!(
            configure_reporting_payload(&[analog.clone()]).unwrap(),
            vec![0x00, 0x15, 0x00, 0x21, 0x00, 0x00, 0x3C, 0x00, 0x05, 0x00]
        );

        let mismatched = ReportingConfig {
            reportable_change: Some(AttributeValue::U8(5)),
            ..analog
        };
        assert!(configure_reporting_payload(&[mismatched]).is_err());
    }

    #[test]
    fn test_configure_reporting_response() {
        assert!(ConfigureReportingResponse::parse(&[0x00]).unwrap().is_success());
        let resp = ConfigureReportingResponse::parse(&[0x8C, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(
            resp.failures,
            vec![AttributeStatus {
                id: 0x0000,
                status: Status::UnreportableAttribute
            }]
        );
    }

    #[test]
    fn test_report_parse() {
        let payload = [0x00, 0x00, 0x10, 0x01, 0x03, 0x40, 0x30, 0xFF];
        let records = parse_report_attributes(&payload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value, AttributeValue::Bool(true));
        assert_eq!(records[1].id, 0x4003);
        assert_eq!(records[1].value, AttributeValue::Enum8(0xFF));
    }
}
