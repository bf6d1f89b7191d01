//! Constants for interpreting MAVLink enum and bitmask fields.

/// HEARTBEAT `base_mode` bits (MAV_MODE_FLAG).
pub mod base_mode {
    pub const CUSTOM_MODE_ENABLED: u8 = 0x01;
    pub const TEST_ENABLED: u8 = 0x02;
    pub const AUTO_ENABLED: u8 = 0x04;
    pub const GUIDED_ENABLED: u8 = 0x08;
    pub const STABILIZE_ENABLED: u8 = 0x10;
    pub const HIL_ENABLED: u8 = 0x20;
    pub const MANUAL_INPUT_ENABLED: u8 = 0x40;
    pub const SAFETY_ARMED: u8 = 0x80;
}

/// COMMAND_ACK `result` codes (MAV_RESULT).
pub mod mav_result {
    pub const ACCEPTED: u8 = 0;
    pub const TEMPORARILY_REJECTED: u8 = 1;
    pub const DENIED: u8 = 2;
    pub const UNSUPPORTED: u8 = 3;
    pub const FAILED: u8 = 4;
    pub const IN_PROGRESS: u8 = 5;
}

/// MISSION_ACK `type` codes (MAV_MISSION_RESULT) with a human-readable reason.
pub mod mission_result {
    pub const ACCEPTED: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const UNSUPPORTED_FRAME: u8 = 2;
    pub const UNSUPPORTED: u8 = 3;
    pub const NO_SPACE: u8 = 4;
    pub const INVALID: u8 = 5;
    pub const OPERATION_CANCELLED: u8 = 15;

    pub fn reason(code: u8) -> String {
        match code {
            ERROR => "Generic error".to_string(),
            UNSUPPORTED_FRAME => "Coordinates out of range".to_string(),
            UNSUPPORTED => "Item index too large".to_string(),
            NO_SPACE => "Not enough space".to_string(),
            INVALID => "Denied by MAV".to_string(),
            OPERATION_CANCELLED => "Timeout".to_string(),
            other => format!("Error {other}"),
        }
    }
}

/// Commands sent through COMMAND_LONG (MAV_CMD).
pub mod command {
    pub const COMPONENT_ARM_DISARM: u16 = 400;
}

/// PARAM_VALUE / PARAM_SET `param_type` (MAV_PARAM_TYPE).
pub mod param_type {
    pub const REAL32: u8 = 9;
}

/// Mission item coordinate frames (MAV_FRAME).
pub mod frame {
    pub const GLOBAL: u8 = 0;
    pub const MISSION: u8 = 2;
    pub const GLOBAL_RELATIVE_ALT: u8 = 3;
}

/// MAV_MISSION_TYPE used for every transfer.
pub const MISSION_TYPE_MISSION: u8 = 0;
