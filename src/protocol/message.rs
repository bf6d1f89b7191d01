//! Message layouts and runtime field values.
//!
//! Every supported message is described by a static [`MessageSpec`]: its id, the
//! crc-extra constant folded into the frame checksum, and the payload fields in wire
//! order. The codec walks these tables; nothing else in the crate knows byte offsets.

use serde::{Deserialize, Serialize};

/// Message ids of the supported MAVLink subset.
pub mod ids {
    pub const HEARTBEAT: u32 = 0;
    pub const SYS_STATUS: u32 = 1;
    pub const SET_MODE: u32 = 11;
    pub const PARAM_REQUEST_READ: u32 = 20;
    pub const PARAM_VALUE: u32 = 22;
    pub const PARAM_SET: u32 = 23;
    pub const ATTITUDE: u32 = 30;
    pub const GLOBAL_POSITION_INT: u32 = 33;
    pub const MISSION_REQUEST: u32 = 40;
    pub const MISSION_REQUEST_LIST: u32 = 43;
    pub const MISSION_COUNT: u32 = 44;
    pub const MISSION_CLEAR_ALL: u32 = 45;
    pub const MISSION_ACK: u32 = 47;
    pub const MISSION_REQUEST_INT: u32 = 51;
    pub const RC_CHANNELS: u32 = 65;
    pub const MISSION_ITEM_INT: u32 = 73;
    pub const VFR_HUD: u32 = 74;
    pub const COMMAND_LONG: u32 = 76;
    pub const COMMAND_ACK: u32 = 77;
    pub const STATUSTEXT: u32 = 253;
}

/// Wire types a payload field can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Fixed-width, NUL-padded character array of the given length.
    Char(usize),
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
}

impl FieldType {
    /// Returns the size in bytes of this field on the wire.
    pub const fn size(&self) -> usize {
        match self {
            FieldType::Char(len) => *len,
            FieldType::Int8 | FieldType::UInt8 => 1,
            FieldType::Int16 | FieldType::UInt16 => 2,
            FieldType::Int32 | FieldType::UInt32 | FieldType::Float32 => 4,
        }
    }
}

/// One named payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
}

const fn field(name: &'static str, ty: FieldType) -> FieldDef {
    FieldDef { name, ty }
}

/// Static description of a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSpec {
    pub id: u32,
    pub name: &'static str,
    pub crc_extra: u8,
    pub fields: &'static [FieldDef],
}

impl MessageSpec {
    /// Full (untruncated) payload length in bytes.
    pub fn payload_len(&self) -> usize {
        self.fields.iter().map(|f| f.ty.size()).sum()
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

use FieldType::*;

const HEARTBEAT_FIELDS: &[FieldDef] = &[
    field("custom_mode", UInt32),
    field("type", UInt8),
    field("autopilot", UInt8),
    field("base_mode", UInt8),
    field("system_status", UInt8),
    field("mavlink_version", UInt8),
];

const SYS_STATUS_FIELDS: &[FieldDef] = &[
    field("onboard_control_sensors_present", UInt32),
    field("onboard_control_sensors_enabled", UInt32),
    field("onboard_control_sensors_health", UInt32),
    field("load", UInt16),
    field("voltage_battery", UInt16),
    field("current_battery", Int16),
    field("drop_rate_comm", UInt16),
    field("errors_comm", UInt16),
    field("errors_count1", UInt16),
    field("errors_count2", UInt16),
    field("errors_count3", UInt16),
    field("errors_count4", UInt16),
    field("battery_remaining", Int8),
];

const SET_MODE_FIELDS: &[FieldDef] = &[
    field("custom_mode", UInt32),
    field("target_system", UInt8),
    field("base_mode", UInt8),
];

const PARAM_REQUEST_READ_FIELDS: &[FieldDef] = &[
    field("param_index", Int16),
    field("target_system", UInt8),
    field("target_component", UInt8),
    field("param_id", Char(16)),
];

const PARAM_VALUE_FIELDS: &[FieldDef] = &[
    field("param_value", Float32),
    field("param_count", UInt16),
    field("param_index", UInt16),
    field("param_id", Char(16)),
    field("param_type", UInt8),
];

const PARAM_SET_FIELDS: &[FieldDef] = &[
    field("param_value", Float32),
    field("target_system", UInt8),
    field("target_component", UInt8),
    field("param_id", Char(16)),
    field("param_type", UInt8),
];

const ATTITUDE_FIELDS: &[FieldDef] = &[
    field("time_boot_ms", UInt32),
    field("roll", Float32),
    field("pitch", Float32),
    field("yaw", Float32),
    field("rollspeed", Float32),
    field("pitchspeed", Float32),
    field("yawspeed", Float32),
];

const GLOBAL_POSITION_INT_FIELDS: &[FieldDef] = &[
    field("time_boot_ms", UInt32),
    field("lat", Int32),
    field("lon", Int32),
    field("alt", Int32),
    field("relative_alt", Int32),
    field("vx", Int16),
    field("vy", Int16),
    field("vz", Int16),
    field("hdg", UInt16),
];

const MISSION_TARGET_FIELDS: &[FieldDef] = &[
    field("target_system", UInt8),
    field("target_component", UInt8),
    field("mission_type", UInt8),
];

const MISSION_COUNT_FIELDS: &[FieldDef] = &[
    field("count", UInt16),
    field("target_system", UInt8),
    field("target_component", UInt8),
    field("mission_type", UInt8),
];

const MISSION_ACK_FIELDS: &[FieldDef] = &[
    field("target_system", UInt8),
    field("target_component", UInt8),
    field("type", UInt8),
    field("mission_type", UInt8),
];

const MISSION_SEQ_FIELDS: &[FieldDef] = &[
    field("seq", UInt16),
    field("target_system", UInt8),
    field("target_component", UInt8),
    field("mission_type", UInt8),
];

const RC_CHANNELS_FIELDS: &[FieldDef] = &[
    field("time_boot_ms", UInt32),
    field("chan1_raw", UInt16),
    field("chan2_raw", UInt16),
    field("chan3_raw", UInt16),
    field("chan4_raw", UInt16),
    field("chan5_raw", UInt16),
    field("chan6_raw", UInt16),
    field("chan7_raw", UInt16),
    field("chan8_raw", UInt16),
    field("chan9_raw", UInt16),
    field("chan10_raw", UInt16),
    field("chan11_raw", UInt16),
    field("chan12_raw", UInt16),
    field("chan13_raw", UInt16),
    field("chan14_raw", UInt16),
    field("chan15_raw", UInt16),
    field("chan16_raw", UInt16),
    field("chan17_raw", UInt16),
    field("chan18_raw", UInt16),
    field("chancount", UInt8),
    field("rssi", UInt8),
];

const MISSION_ITEM_INT_FIELDS: &[FieldDef] = &[
    field("param1", Float32),
    field("param2", Float32),
    field("param3", Float32),
    field("param4", Float32),
    field("x", Int32),
    field("y", Int32),
    field("z", Float32),
    field("seq", UInt16),
    field("command", UInt16),
    field("target_system", UInt8),
    field("target_component", UInt8),
    field("frame", UInt8),
    field("current", UInt8),
    field("autocontinue", UInt8),
    field("mission_type", UInt8),
];

const VFR_HUD_FIELDS: &[FieldDef] = &[
    field("airspeed", Float32),
    field("groundspeed", Float32),
    field("alt", Float32),
    field("climb", Float32),
    field("heading", Int16),
    field("throttle", UInt16),
];

const COMMAND_LONG_FIELDS: &[FieldDef] = &[
    field("param1", Float32),
    field("param2", Float32),
    field("param3", Float32),
    field("param4", Float32),
    field("param5", Float32),
    field("param6", Float32),
    field("param7", Float32),
    field("command", UInt16),
    field("target_system", UInt8),
    field("target_component", UInt8),
    field("confirmation", UInt8),
];

const COMMAND_ACK_FIELDS: &[FieldDef] = &[field("command", UInt16), field("result", UInt8)];

const STATUSTEXT_FIELDS: &[FieldDef] = &[field("severity", UInt8), field("text", Char(50))];

/// Registry of every message this crate can parse or serialize, sorted by id.
pub static MESSAGES: &[MessageSpec] = &[
    MessageSpec { id: ids::HEARTBEAT, name: "HEARTBEAT", crc_extra: 50, fields: HEARTBEAT_FIELDS },
    MessageSpec { id: ids::SYS_STATUS, name: "SYS_STATUS", crc_extra: 124, fields: SYS_STATUS_FIELDS },
    MessageSpec { id: ids::SET_MODE, name: "SET_MODE", crc_extra: 89, fields: SET_MODE_FIELDS },
    MessageSpec {
        id: ids::PARAM_REQUEST_READ,
        name: "PARAM_REQUEST_READ",
        crc_extra: 214,
        fields: PARAM_REQUEST_READ_FIELDS,
    },
    MessageSpec { id: ids::PARAM_VALUE, name: "PARAM_VALUE", crc_extra: 220, fields: PARAM_VALUE_FIELDS },
    MessageSpec { id: ids::PARAM_SET, name: "PARAM_SET", crc_extra: 168, fields: PARAM_SET_FIELDS },
    MessageSpec { id: ids::ATTITUDE, name: "ATTITUDE", crc_extra: 39, fields: ATTITUDE_FIELDS },
    MessageSpec {
        id: ids::GLOBAL_POSITION_INT,
        name: "GLOBAL_POSITION_INT",
        crc_extra: 104,
        fields: GLOBAL_POSITION_INT_FIELDS,
    },
    MessageSpec {
        id: ids::MISSION_REQUEST,
        name: "MISSION_REQUEST",
        crc_extra: 230,
        fields: MISSION_SEQ_FIELDS,
    },
    MessageSpec {
        id: ids::MISSION_REQUEST_LIST,
        name: "MISSION_REQUEST_LIST",
        crc_extra: 132,
        fields: MISSION_TARGET_FIELDS,
    },
    MessageSpec {
        id: ids::MISSION_COUNT,
        name: "MISSION_COUNT",
        crc_extra: 221,
        fields: MISSION_COUNT_FIELDS,
    },
    MessageSpec {
        id: ids::MISSION_CLEAR_ALL,
        name: "MISSION_CLEAR_ALL",
        crc_extra: 232,
        fields: MISSION_TARGET_FIELDS,
    },
    MessageSpec { id: ids::MISSION_ACK, name: "MISSION_ACK", crc_extra: 153, fields: MISSION_ACK_FIELDS },
    MessageSpec {
        id: ids::MISSION_REQUEST_INT,
        name: "MISSION_REQUEST_INT",
        crc_extra: 196,
        fields: MISSION_SEQ_FIELDS,
    },
    MessageSpec { id: ids::RC_CHANNELS, name: "RC_CHANNELS", crc_extra: 118, fields: RC_CHANNELS_FIELDS },
    MessageSpec {
        id: ids::MISSION_ITEM_INT,
        name: "MISSION_ITEM_INT",
        crc_extra: 38,
        fields: MISSION_ITEM_INT_FIELDS,
    },
    MessageSpec { id: ids::VFR_HUD, name: "VFR_HUD", crc_extra: 20, fields: VFR_HUD_FIELDS },
    MessageSpec {
        id: ids::COMMAND_LONG,
        name: "COMMAND_LONG",
        crc_extra: 152,
        fields: COMMAND_LONG_FIELDS,
    },
    MessageSpec { id: ids::COMMAND_ACK, name: "COMMAND_ACK", crc_extra: 143, fields: COMMAND_ACK_FIELDS },
    MessageSpec { id: ids::STATUSTEXT, name: "STATUSTEXT", crc_extra: 83, fields: STATUSTEXT_FIELDS },
];

/// Look up the layout for a message id.
pub fn lookup(id: u32) -> Option<&'static MessageSpec> {
    MESSAGES.binary_search_by_key(&id, |spec| spec.id).ok().map(|idx| &MESSAGES[idx])
}

/// Runtime value of a single payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
    Text(String),
}

impl Value {
    /// Integer view of a numeric value (floats truncate toward zero).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int8(v) => Some(v as i64),
            Value::UInt8(v) => Some(v as i64),
            Value::Int16(v) => Some(v as i64),
            Value::UInt16(v) => Some(v as i64),
            Value::Int32(v) => Some(v as i64),
            Value::UInt32(v) => Some(v as i64),
            Value::Float32(v) => Some(v as i64),
            Value::Text(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float32(v) => Some(v as f64),
            Value::Text(_) => None,
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from!(i8 => Int8, u8 => UInt8, i16 => Int16, u16 => UInt16, i32 => Int32, u32 => UInt32, f32 => Float32);

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// Types that can be read back out of a decoded field.
///
/// Decoding always produces the exact variant of the layout, so these conversions
/// only succeed when the requested type matches the field's wire type.
pub trait FieldValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

field_value!(i8 => Int8, u8 => UInt8, i16 => Int16, u16 => UInt16, i32 => Int32, u32 => UInt32, f32 => Float32);

impl FieldValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}
