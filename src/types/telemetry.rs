//! Decoded telemetry values.
//!
//! Each type is built from a [`ParsedMessage`] of one message id and converts wire
//! units (1e7 degrees, millimetres, centi-units) into SI-ish values. `received_at`
//! is the ingest time, which is what freshness checks compare against.

use serde::Serialize;
use tokio::time::Instant;

use super::{BaseMode, FlightMode};
use crate::protocol::ParsedMessage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartbeatState {
    pub system_id: u8,
    pub component_id: u8,
    pub vehicle_type: u8,
    pub autopilot: u8,
    pub base_mode: BaseMode,
    pub custom_mode: u32,
    pub system_status: u8,
    pub received_at: Instant,
}

impl HeartbeatState {
    pub fn from_message(msg: &ParsedMessage, received_at: Instant) -> Self {
        Self {
            system_id: msg.system_id,
            component_id: msg.component_id,
            vehicle_type: msg.get_or_default("type"),
            autopilot: msg.get_or_default("autopilot"),
            base_mode: BaseMode(msg.get_or_default("base_mode")),
            custom_mode: msg.get_or_default("custom_mode"),
            system_status: msg.get_or_default("system_status"),
            received_at,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.base_mode.is_armed()
    }

    pub fn flight_mode(&self) -> Option<FlightMode> {
        FlightMode::from_custom_mode(self.custom_mode)
    }
}

/// Vehicle attitude in radians and radians per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeState {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub rollspeed: f32,
    pub pitchspeed: f32,
    pub yawspeed: f32,
    pub received_at: Instant,
}

impl AttitudeState {
    pub fn from_message(msg: &ParsedMessage, received_at: Instant) -> Self {
        Self {
            roll: msg.get_or_default("roll"),
            pitch: msg.get_or_default("pitch"),
            yaw: msg.get_or_default("yaw"),
            rollspeed: msg.get_or_default("rollspeed"),
            pitchspeed: msg.get_or_default("pitchspeed"),
            yawspeed: msg.get_or_default("yawspeed"),
            received_at,
        }
    }
}

/// Fused global position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Metres above mean sea level.
    pub altitude_msl: f32,
    /// Metres above home.
    pub relative_altitude: f32,
    /// Ground velocity north, east, down in m/s.
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    /// Degrees.
    pub heading: f32,
    pub received_at: Instant,
}

impl PositionState {
    pub fn from_message(msg: &ParsedMessage, received_at: Instant) -> Self {
        Self {
            latitude: msg.get_or_default::<i32>("lat") as f64 / 1e7,
            longitude: msg.get_or_default::<i32>("lon") as f64 / 1e7,
            altitude_msl: msg.get_or_default::<i32>("alt") as f32 / 1000.0,
            relative_altitude: msg.get_or_default::<i32>("relative_alt") as f32 / 1000.0,
            vx: msg.get_or_default::<i16>("vx") as f32 / 100.0,
            vy: msg.get_or_default::<i16>("vy") as f32 / 100.0,
            vz: msg.get_or_default::<i16>("vz") as f32 / 100.0,
            heading: msg.get_or_default::<u16>("hdg") as f32 / 100.0,
            received_at,
        }
    }
}

/// HUD values as reported by the autopilot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VfrHudState {
    pub airspeed: f32,
    pub groundspeed: f32,
    pub altitude: f32,
    pub climb_rate: f32,
    /// Compass heading, degrees.
    pub heading: i16,
    /// Percent.
    pub throttle: u16,
    pub received_at: Instant,
}

impl VfrHudState {
    pub fn from_message(msg: &ParsedMessage, received_at: Instant) -> Self {
        Self {
            airspeed: msg.get_or_default("airspeed"),
            groundspeed: msg.get_or_default("groundspeed"),
            altitude: msg.get_or_default("alt"),
            climb_rate: msg.get_or_default("climb"),
            heading: msg.get_or_default("heading"),
            throttle: msg.get_or_default("throttle"),
            received_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    pub voltage: f32,
    /// Amperes; 0 when the autopilot does not measure current.
    pub current: f32,
    /// Percent, -1 when unknown.
    pub remaining_percent: i8,
    pub received_at: Instant,
}

impl BatteryState {
    /// Decode from SYS_STATUS.
    pub fn from_message(msg: &ParsedMessage, received_at: Instant) -> Self {
        let current_raw: i16 = msg.get_or_default("current_battery");
        Self {
            voltage: msg.get_or_default::<u16>("voltage_battery") as f32 / 1000.0,
            current: if current_raw >= 0 { current_raw as f32 / 100.0 } else { 0.0 },
            remaining_percent: msg.get_or_default("battery_remaining"),
            received_at,
        }
    }

    pub fn remaining_known(&self) -> bool {
        self.remaining_percent >= 0
    }
}

pub const RC_CHANNEL_COUNT: usize = 18;

/// Raw RC input, microseconds per channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RcChannels {
    pub channels: [u16; RC_CHANNEL_COUNT],
    pub count: u8,
    pub rssi: u8,
    pub received_at: Instant,
}

impl RcChannels {
    pub fn from_message(msg: &ParsedMessage, received_at: Instant) -> Self {
        let mut channels = [0u16; RC_CHANNEL_COUNT];
        for (idx, slot) in channels.iter_mut().enumerate() {
            *slot = msg.get_or_default(&format!("chan{}_raw", idx + 1));
        }
        Self {
            channels,
            count: msg.get_or_default("chancount"),
            rssi: msg.get_or_default("rssi"),
            received_at,
        }
    }

    /// Channels the receiver reports as populated.
    pub fn active(&self) -> &[u16] {
        &self.channels[..(self.count as usize).min(RC_CHANNEL_COUNT)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MessageSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl MessageSeverity {
    /// Bucket a MAV_SEVERITY value.
    pub fn from_mav_severity(severity: u8) -> Self {
        match severity {
            0..=2 => MessageSeverity::Critical,
            3 => MessageSeverity::Error,
            4 => MessageSeverity::Warning,
            _ => MessageSeverity::Info,
        }
    }
}

/// Text from STATUSTEXT.
#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotMessage {
    pub system_id: u8,
    pub severity: MessageSeverity,
    pub text: String,
    pub received_at: Instant,
}

impl AutopilotMessage {
    /// `None` when the text is empty once padding and whitespace are removed.
    pub fn from_message(msg: &ParsedMessage, received_at: Instant) -> Option<Self> {
        let raw: String = msg.get_or_default("text");
        let text = raw.trim_matches(char::from(0)).trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            system_id: msg.system_id,
            severity: MessageSeverity::from_mav_severity(msg.get_or_default("severity")),
            text: text.to_string(),
            received_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamValue {
    pub id: String,
    pub value: f32,
    pub index: u16,
    pub count: u16,
    pub param_type: u8,
}

impl ParamValue {
    pub fn from_message(msg: &ParsedMessage) -> Self {
        let id: String = msg.get_or_default("param_id");
        Self {
            id: id.trim_matches(char::from(0)).to_string(),
            value: msg.get_or_default("param_value"),
            index: msg.get_or_default("param_index"),
            count: msg.get_or_default("param_count"),
            param_type: msg.get_or_default("param_type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Value, ids, parse, serialize};

    fn decode(id: u32, values: &[(&str, Value)]) -> ParsedMessage {
        parse(&serialize(id, 0, 1, 1, values)).expect("valid frame")
    }

    #[test]
    fn position_units() {
        let msg = decode(
            ids::GLOBAL_POSITION_INT,
            &[
                ("lat", Value::Int32(473_977_420)),
                ("lon", Value::Int32(85_455_940)),
                ("alt", Value::Int32(488_500)),
                ("relative_alt", Value::Int32(12_340)),
                ("vx", Value::Int16(150)),
                ("vy", Value::Int16(-25)),
                ("vz", Value::Int16(0)),
                ("hdg", Value::UInt16(27_050)),
            ],
        );
        let pos = PositionState::from_message(&msg, Instant::now());
        assert!((pos.latitude - 47.397742).abs() < 1e-9);
        assert!((pos.longitude - 8.545594).abs() < 1e-9);
        assert!((pos.altitude_msl - 488.5).abs() < 1e-3);
        assert!((pos.relative_altitude - 12.34).abs() < 1e-3);
        assert!((pos.vx - 1.5).abs() < 1e-6);
        assert!((pos.vy + 0.25).abs() < 1e-6);
        assert!((pos.heading - 270.5).abs() < 1e-3);
    }

    #[test]
    fn battery_units_and_unknown_current() {
        let msg = decode(
            ids::SYS_STATUS,
            &[
                ("voltage_battery", Value::UInt16(12_600)),
                ("current_battery", Value::Int16(-1)),
                ("battery_remaining", Value::Int8(-1)),
            ],
        );
        let battery = BatteryState::from_message(&msg, Instant::now());
        assert!((battery.voltage - 12.6).abs() < 1e-4);
        assert_eq!(battery.current, 0.0);
        assert!(!battery.remaining_known());

        let msg = decode(
            ids::SYS_STATUS,
            &[("current_battery", Value::Int16(1_250)), ("battery_remaining", Value::Int8(76))],
        );
        let battery = BatteryState::from_message(&msg, Instant::now());
        assert!((battery.current - 12.5).abs() < 1e-4);
        assert_eq!(battery.remaining_percent, 76);
    }

    #[test]
    fn heartbeat_armed_and_mode() {
        let msg = decode(
            ids::HEARTBEAT,
            &[("custom_mode", Value::UInt32(11)), ("base_mode", Value::UInt8(0x81))],
        );
        let hb = HeartbeatState::from_message(&msg, Instant::now());
        assert!(hb.is_armed());
        assert_eq!(hb.flight_mode(), Some(FlightMode::Rtl));
    }

    #[test]
    fn status_text_severity_and_blank_filtering() {
        let msg = decode(ids::STATUSTEXT, &[("severity", Value::UInt8(2)), ("text", "EKF failsafe".into())]);
        let text = AutopilotMessage::from_message(&msg, Instant::now()).expect("non-blank");
        assert_eq!(text.severity, MessageSeverity::Critical);
        assert_eq!(text.text, "EKF failsafe");

        let blank = decode(ids::STATUSTEXT, &[("severity", Value::UInt8(6)), ("text", "   ".into())]);
        assert!(AutopilotMessage::from_message(&blank, Instant::now()).is_none());

        assert_eq!(MessageSeverity::from_mav_severity(3), MessageSeverity::Error);
        assert_eq!(MessageSeverity::from_mav_severity(4), MessageSeverity::Warning);
        assert_eq!(MessageSeverity::from_mav_severity(6), MessageSeverity::Info);
    }

    #[test]
    fn rc_channels_active_slice() {
        let msg = decode(
            ids::RC_CHANNELS,
            &[
                ("chan1_raw", Value::UInt16(1500)),
                ("chan3_raw", Value::UInt16(1100)),
                ("chancount", Value::UInt8(8)),
                ("rssi", Value::UInt8(200)),
            ],
        );
        let rc = RcChannels::from_message(&msg, Instant::now());
        assert_eq!(rc.active().len(), 8);
        assert_eq!(rc.channels[0], 1500);
        assert_eq!(rc.channels[2], 1100);
        assert_eq!(rc.rssi, 200);
    }

    #[test]
    fn param_value_decoding() {
        let msg = decode(
            ids::PARAM_VALUE,
            &[
                ("param_id", "ARMING_CHECK".into()),
                ("param_value", Value::Float32(1.0)),
                ("param_index", Value::UInt16(12)),
                ("param_count", Value::UInt16(900)),
                ("param_type", Value::UInt8(9)),
            ],
        );
        let param = ParamValue::from_message(&msg);
        assert_eq!(param.id, "ARMING_CHECK");
        assert_eq!(param.value, 1.0);
        assert_eq!((param.index, param.count), (12, 900));
    }
}
