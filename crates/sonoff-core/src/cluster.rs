//! Cluster schemas for the Sonoff relay family
//!
//! Static tables mapping attribute names to wire ids and types, plus the
//! command definitions of the manufacturer-specific cluster. These tables are
//! the single source of truth for translation and frame classification.

use crate::error::DriverError;
use zcl_protocol::DataType;

/// Cluster IDs used by the driver
pub mod id {
    pub const BASIC: u16 = 0x0000;
    pub const ON_OFF: u16 = 0x0006;
    /// Sonoff manufacturer-specific cluster (64529)
    pub const SONOFF: u16 = 0xFC11;
}

/// Manufacturer code required on every frame of the Sonoff cluster
pub const SONOFF_MANUFACTURER_ID: u16 = 0x1286;

/// `protocolData` command (host to device)
pub const CMD_PROTOCOL_DATA: u8 = 0x01;
/// `protocolDataResponse` command (device to host)
pub const CMD_PROTOCOL_DATA_RESPONSE: u8 = 0x0B;

/// TurboMode raw value for normal radio power
pub const TURBO_MODE_OFF: i64 = 9;
/// TurboMode raw value for extended radio range
pub const TURBO_MODE_ON: i64 = 20;

/// On/Off cluster commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OnOffCommand {
    Off = 0x00,
    On = 0x01,
    Toggle = 0x02,
}

impl OnOffCommand {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Off),
            0x01 => Some(Self::On),
            0x02 => Some(Self::Toggle),
            _ => None,
        }
    }
}

/// Declared wire type of an attribute or command argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Bool,
    Uint8,
    Uint16,
    Int16,
    Enum8,
    Buffer,
}

impl WireType {
    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            WireType::Bool => DataType::Boolean,
            WireType::Uint8 => DataType::Uint8,
            WireType::Uint16 => DataType::Uint16,
            WireType::Int16 => DataType::Int16,
            WireType::Enum8 => DataType::Enum8,
            WireType::Buffer => DataType::OctetString,
        }
    }
}

/// How an attribute's raw value maps to its settings representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Booleans stay booleans, numbers stay numbers
    Plain,
    /// Radio power level {9, 20} shown as a boolean
    TurboMode,
    /// Integer shown as its decimal string
    DecimalString,
    /// Enumeration shown by name
    Enum(&'static [(&'static str, u8)]),
}

/// One attribute of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    /// Attribute name on the wire schema
    pub name: &'static str,
    pub id: u16,
    pub wire_type: WireType,
    /// Key of the matching entry in the host settings object
    pub setting: &'static str,
    pub conversion: Conversion,
}

impl AttributeSpec {
    const fn plain(name: &'static str, id: u16, wire_type: WireType) -> Self {
        Self {
            name,
            id,
            wire_type,
            setting: name,
            conversion: Conversion::Plain,
        }
    }
}

/// Direction of a cluster command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandDirection {
    HostToDevice,
    DeviceToHost,
}

/// One command argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub wire_type: WireType,
}

/// One cluster-specific command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub id: u8,
    pub direction: CommandDirection,
    pub manufacturer_specific: bool,
    pub args: &'static [ArgSpec],
}

/// Immutable description of a cluster
#[derive(Debug)]
pub struct ClusterSchema {
    pub id: u16,
    pub name: &'static str,
    /// Manufacturer code scoped onto each transaction, if any
    pub manufacturer_code: Option<u16>,
    pub attributes: &'static [AttributeSpec],
    pub commands: &'static [CommandSpec],
}

impl ClusterSchema {
    /// Look up an attribute by schema name or settings key
    pub fn attribute(&self, name: &str) -> Result<&AttributeSpec, DriverError> {
        self.attributes
            .iter()
            .find(|a| a.name == name || a.setting == name)
            .ok_or_else(|| DriverError::UnknownAttribute {
                cluster: self.name,
                name: name.to_string(),
            })
    }

    /// Look up an attribute by settings key
    #[must_use]
    pub fn find_setting(&self, key: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.setting == key)
    }

    #[must_use]
    pub fn attribute_by_id(&self, id: u16) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.id == id)
    }

    /// Look up a cluster-specific command
    pub fn command(&self, id: u8, direction: CommandDirection) -> Result<&CommandSpec, DriverError> {
        self.commands
            .iter()
            .find(|c| c.id == id && c.direction == direction)
            .ok_or(DriverError::UnknownCommand {
                cluster: self.id,
                command: id,
            })
    }
}

const DATA_ARG: &[ArgSpec] = &[ArgSpec {
    name: "data",
    wire_type: WireType::Buffer,
}];

/// Sonoff custom cluster (0xFC11)
pub static SONOFF_CLUSTER: ClusterSchema = ClusterSchema {
    id: id::SONOFF,
    name: "SonoffCluster",
    manufacturer_code: Some(SONOFF_MANUFACTURER_ID),
    attributes: &[
        AttributeSpec::plain("child_lock", 0x0000, WireType::Bool),
        // Network status LED
        AttributeSpec::plain("network_led", 0x0001, WireType::Bool),
        AttributeSpec::plain("backlight", 0x0002, WireType::Bool),
        // Radio power: 9 normal, 20 extended range
        AttributeSpec {
            name: "TurboMode",
            id: 0x0012,
            wire_type: WireType::Int16,
            setting: "TurboMode",
            conversion: Conversion::TurboMode,
        },
        AttributeSpec::plain("power_on_delay_state", 0x0014, WireType::Bool),
        // Milliseconds
        AttributeSpec::plain("power_on_delay_time", 0x0015, WireType::Uint16),
        // 0x00 edge, 0x01 pulse, 0x02 follow_on, 0x82 follow_off
        AttributeSpec {
            name: "switch_mode",
            id: 0x0016,
            wire_type: WireType::Uint8,
            setting: "switch_mode",
            conversion: Conversion::DecimalString,
        },
        // Physical switch no longer drives the relay
        AttributeSpec::plain("detach_mode", 0x0017, WireType::Bool),
        AttributeSpec::plain("tamper", 0x2000, WireType::Uint8),
        AttributeSpec::plain("illuminance", 0x2001, WireType::Uint8),
        AttributeSpec::plain("open_window", 0x6000, WireType::Bool),
        AttributeSpec::plain("frost_protection_temperature", 0x6002, WireType::Int16),
        AttributeSpec::plain("idle_steps", 0x6003, WireType::Uint16),
        AttributeSpec::plain("closing_steps", 0x6004, WireType::Uint16),
        AttributeSpec::plain("valve_opening_limit_voltage", 0x6005, WireType::Uint16),
        AttributeSpec::plain("valve_closing_limit_voltage", 0x6006, WireType::Uint16),
        AttributeSpec::plain("valve_motor_running_voltage", 0x6007, WireType::Uint16),
        AttributeSpec::plain("valve_opening_degree", 0x600B, WireType::Uint8),
        AttributeSpec::plain("valve_closing_degree", 0x600C, WireType::Uint8),
    ],
    commands: &[
        CommandSpec {
            name: "protocolData",
            id: CMD_PROTOCOL_DATA,
            direction: CommandDirection::HostToDevice,
            manufacturer_specific: true,
            args: DATA_ARG,
        },
        CommandSpec {
            name: "protocolDataResponse",
            id: CMD_PROTOCOL_DATA_RESPONSE,
            direction: CommandDirection::DeviceToHost,
            manufacturer_specific: false,
            args: DATA_ARG,
        },
    ],
};

/// Power-on behavior names and their enum8 codes
pub const POWER_ON_BEHAVIOR: &[(&str, u8)] = &[
    ("off", 0x00),
    ("on", 0x01),
    ("toggle", 0x02),
    ("last_state", 0xFF),
];

/// On/Off cluster (0x0006) with the startup behavior attribute
pub static ON_OFF_CLUSTER: ClusterSchema = ClusterSchema {
    id: id::ON_OFF,
    name: "onOff",
    manufacturer_code: None,
    attributes: &[
        AttributeSpec {
            name: "onOff",
            id: 0x0000,
            wire_type: WireType::Bool,
            setting: "onoff",
            conversion: Conversion::Plain,
        },
        AttributeSpec {
            name: "powerOnBehavior",
            id: 0x4003,
            wire_type: WireType::Enum8,
            setting: "power_on_behavior",
            conversion: Conversion::Enum(POWER_ON_BEHAVIOR),
        },
    ],
    commands: &[
        CommandSpec {
            name: "setOff",
            id: OnOffCommand::Off as u8,
            direction: CommandDirection::HostToDevice,
            manufacturer_specific: false,
            args: &[],
        },
        CommandSpec {
            name: "setOn",
            id: OnOffCommand::On as u8,
            direction: CommandDirection::HostToDevice,
            manufacturer_specific: false,
            args: &[],
        },
        CommandSpec {
            name: "toggle",
            id: OnOffCommand::Toggle as u8,
            direction: CommandDirection::HostToDevice,
            manufacturer_specific: false,
            args: &[],
        },
    ],
};

/// Clusters the driver knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterKind {
    OnOff,
    Sonoff,
}

impl ClusterKind {
    #[must_use]
    pub fn schema(self) -> &'static ClusterSchema {
        match self {
            ClusterKind::OnOff => &ON_OFF_CLUSTER,
            ClusterKind::Sonoff => &SONOFF_CLUSTER,
        }
    }

    #[must_use]
    pub fn from_cluster_id(cluster_id: u16) -> Option<Self> {
        match cluster_id {
            id::ON_OFF => Some(ClusterKind::OnOff),
            id::SONOFF => Some(ClusterKind::Sonoff),
            _ => None,
        }
    }
}
