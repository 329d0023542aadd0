//! Sonoff relay driver core
//!
//! Access to the manufacturer-specific cluster 0xFC11 (manufacturer 0x1286):
//! attribute schema, translation between wire values and host settings,
//! the inching command codec, inbound frame classification and the bound
//! toggle router, tied together by a per-device driver.

pub mod attributes;
pub mod bound;
pub mod cluster;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod events;
pub mod inching;
pub mod registry;
pub mod transaction;
pub mod translate;

#[cfg(test)]
mod test_support;

pub use attributes::AttributeClient;
pub use bound::{BoundCommandRouter, BoundDisposition};
pub use cluster::{
    ClusterKind, ClusterSchema, ON_OFF_CLUSTER, SONOFF_CLUSTER, SONOFF_MANUFACTURER_ID,
};
pub use config::DriverConfig;
pub use device::{DeviceVariant, Endpoint, ReportingIntervals, ZigbeeDevice};
pub use dispatch::{classify, Disposition};
pub use driver::{Handled, SonoffDevice};
pub use error::{DriverError, InchingError};
pub use events::{DeviceEvent, DeviceEventKind};
pub use inching::{InchingMode, InchingPayload, InchingRequest, ResponseOutcome, StatusResponse};
pub use registry::DeviceRegistry;
pub use transaction::{ClusterHandle, Transaction};
pub use translate::{SettingValue, Settings};
