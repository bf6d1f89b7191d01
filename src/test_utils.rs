//! Frame builders for tests and benchmarks
//!
//! [`VehicleFrames`] plays the autopilot side: it encodes the telemetry and
//! mission replies a real vehicle would send, with its own sequence counter.

use bytes::Bytes;

use crate::protocol::{Encoder, Value, ids};
use crate::types::FlightMode;
use crate::types::mav_flags::base_mode;

/// Default vehicle identity used throughout the tests.
pub const VEHICLE_SYSTEM_ID: u8 = 1;
pub const VEHICLE_COMPONENT_ID: u8 = 1;

#[derive(Debug)]
pub struct VehicleFrames {
    encoder: Encoder,
}

impl Default for VehicleFrames {
    fn default() -> Self {
        Self::new(VEHICLE_SYSTEM_ID, VEHICLE_COMPONENT_ID)
    }
}

impl VehicleFrames {
    pub fn new(system_id: u8, component_id: u8) -> Self {
        Self { encoder: Encoder::new(system_id, component_id) }
    }

    pub fn heartbeat(&self, mode: FlightMode, armed: bool) -> Bytes {
        let mut flags = base_mode::CUSTOM_MODE_ENABLED;
        if armed {
            flags |= base_mode::SAFETY_ARMED;
        }
        self.encoder.encode(
            ids::HEARTBEAT,
            &[
                ("custom_mode", mode.custom_mode().into()),
                ("type", Value::UInt8(1)),
                ("autopilot", Value::UInt8(3)),
                ("base_mode", flags.into()),
                ("system_status", Value::UInt8(4)),
                ("mavlink_version", Value::UInt8(3)),
            ],
        )
    }

    pub fn attitude(&self, roll: f32, pitch: f32, yaw: f32) -> Bytes {
        self.encoder.encode(
            ids::ATTITUDE,
            &[("roll", roll.into()), ("pitch", pitch.into()), ("yaw", yaw.into())],
        )
    }

    /// GLOBAL_POSITION_INT from degrees and meters.
    pub fn position(&self, latitude: f64, longitude: f64, altitude_m: f32) -> Bytes {
        self.encoder.encode(
            ids::GLOBAL_POSITION_INT,
            &[
                ("lat", Value::Int32((latitude * 1e7).round() as i32)),
                ("lon", Value::Int32((longitude * 1e7).round() as i32)),
                ("alt", Value::Int32((altitude_m * 1000.0) as i32)),
                ("relative_alt", Value::Int32((altitude_m * 1000.0) as i32)),
                ("hdg", Value::UInt16(9000)),
            ],
        )
    }

    pub fn sys_status(&self, voltage: f32, remaining_percent: i8) -> Bytes {
        self.encoder.encode(
            ids::SYS_STATUS,
            &[
                ("voltage_battery", Value::UInt16((voltage * 1000.0) as u16)),
                ("current_battery", Value::Int16(-1)),
                ("battery_remaining", remaining_percent.into()),
            ],
        )
    }

    pub fn statustext(&self, severity: u8, text: &str) -> Bytes {
        self.encoder.encode(ids::STATUSTEXT, &[("severity", severity.into()), ("text", text.into())])
    }

    pub fn command_ack(&self, command: u16, result: u8) -> Bytes {
        self.encoder.encode(ids::COMMAND_ACK, &[("command", command.into()), ("result", result.into())])
    }

    pub fn mission_request(&self, seq: u16) -> Bytes {
        self.encoder.encode(ids::MISSION_REQUEST_INT, &[("seq", seq.into())])
    }

    pub fn mission_count(&self, count: u16) -> Bytes {
        self.encoder.encode(ids::MISSION_COUNT, &[("count", count.into())])
    }

    pub fn mission_ack(&self, code: u8) -> Bytes {
        self.encoder.encode(ids::MISSION_ACK, &[("type", code.into())])
    }

    /// `frames` telemetry messages cycling through heartbeat, attitude, position
    /// and battery, concatenated into one byte stream.
    pub fn telemetry_burst(&self, frames: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for i in 0..frames {
            let frame = match i % 4 {
                0 => self.heartbeat(FlightMode::Auto, true),
                1 => self.attitude(0.1, -0.05, 1.5),
                2 => self.position(-35.363261, 149.165230, 584.0),
                _ => self.sys_status(12.4, 80),
            };
            out.extend_from_slice(&frame);
        }
        out
    }
}

/// Split `bytes` into chunks of `size` (the last one may be shorter).
pub fn chunked(bytes: &[u8], size: usize) -> Vec<Bytes> {
    bytes.chunks(size.max(1)).map(Bytes::copy_from_slice).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FrameReassembler, parse};

    #[test]
    fn burst_reassembles_into_valid_frames() {
        let vehicle = VehicleFrames::default();
        let stream = vehicle.telemetry_burst(40);
        let mut reassembler = FrameReassembler::default();
        let mut parsed = Vec::new();
        for chunk in chunked(&stream, 7) {
            for frame in reassembler.push(&chunk) {
                parsed.push(parse(&frame).expect("valid frame"));
            }
        }
        assert_eq!(parsed.len(), 40);
        assert_eq!(parsed[0].message_id, ids::HEARTBEAT);
        assert_eq!(parsed[2].get::<i32>("lat"), Some(-353_632_610));
        assert!(parsed.windows(2).all(|w| w[1].sequence == w[0].sequence.wrapping_add(1)));
    }
}
