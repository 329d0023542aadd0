//! Zigbee Cluster Library wire format
//!
//! This crate implements the parts of the ZCL frame format needed to talk to
//! manufacturer-specific clusters: the frame header, global attribute commands,
//! attribute value encoding and the transport seam a radio stack plugs into.

pub mod attribute;
pub mod frame;
pub mod transport;
pub mod types;

pub use attribute::{
    configure_reporting_payload, parse_report_attributes, read_attributes_payload,
    write_attributes_payload, AttributeRecord, AttributeStatus, AttributeValue,
    ConfigureReportingResponse, ReadAttributesResponse, ReportingConfig,
    WriteAttributesResponse,
};
pub use frame::{Direction, FrameType, ZclFrame};
pub use transport::{ClusterAddress, DEFAULT_TIMEOUT, InboundFrame, SendOptions, ZclRequest, ZclTransport};
pub use types::*;
