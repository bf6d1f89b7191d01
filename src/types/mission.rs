//! Mission items and transfer progress.

use serde::{Deserialize, Serialize};

use super::mav_flags::frame;
use crate::protocol::ParsedMessage;

/// MAV_CMD numbers used in missions.
pub struct MavCmd;

impl MavCmd {
    pub const HOME: u16 = 0;
    pub const WAYPOINT: u16 = 16;
    pub const LOITER_UNLIMITED: u16 = 17;
    pub const LOITER_TURNS: u16 = 18;
    pub const LOITER_TIME: u16 = 19;
    pub const RETURN_TO_LAUNCH: u16 = 20;
    pub const LAND: u16 = 21;
    pub const TAKEOFF: u16 = 22;
    pub const LOITER_TO_ALT: u16 = 31;
}

/// Acceptance radius used when a waypoint leaves param2 unset.
pub const DEFAULT_ACCEPTANCE_RADIUS: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionItem {
    pub seq: u16,
    pub command: u16,
    pub frame: u8,
    pub param1: f32,
    pub param2: f32,
    pub param3: f32,
    pub param4: f32,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Metres, interpreted according to `frame`.
    pub altitude: f32,
    pub autocontinue: bool,
}

impl Default for MissionItem {
    fn default() -> Self {
        Self {
            seq: 0,
            command: MavCmd::WAYPOINT,
            frame: frame::GLOBAL_RELATIVE_ALT,
            param1: 0.0,
            param2: 0.0,
            param3: 0.0,
            param4: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            autocontinue: true,
        }
    }
}

impl MissionItem {
    pub fn waypoint(seq: u16, latitude: f64, longitude: f64, altitude: f32) -> Self {
        Self { seq, latitude, longitude, altitude, ..Self::default() }
    }

    pub fn with_command(mut self, command: u16) -> Self {
        self.command = command;
        self
    }

    /// Waypoint acceptance radius in metres (param2 when positive).
    pub fn acceptance_radius(&self) -> f32 {
        if self.param2 > 0.0 { self.param2 } else { DEFAULT_ACCEPTANCE_RADIUS }
    }

    /// Decode a MISSION_ITEM_INT.
    pub fn from_message(msg: &ParsedMessage) -> Self {
        Self {
            seq: msg.get_or_default("seq"),
            command: msg.get_or_default("command"),
            frame: msg.get_or_default("frame"),
            param1: msg.get_or_default("param1"),
            param2: msg.get_or_default("param2"),
            param3: msg.get_or_default("param3"),
            param4: msg.get_or_default("param4"),
            latitude: msg.get_or_default::<i32>("x") as f64 / 1e7,
            longitude: msg.get_or_default::<i32>("y") as f64 / 1e7,
            altitude: msg.get_or_default("z"),
            autocontinue: msg.get_or_default::<u8>("autocontinue") != 0,
        }
    }

    /// Latitude as sent on the wire (degrees × 1e7).
    pub fn latitude_e7(&self) -> i32 {
        (self.latitude * 1e7).round() as i32
    }

    pub fn longitude_e7(&self) -> i32 {
        (self.longitude * 1e7).round() as i32
    }
}

/// Most items one transfer can address: MISSION_COUNT and `seq` are 16-bit.
pub const MAX_MISSION_ITEMS: usize = u16::MAX as usize;

/// Rewrite `seq` so it matches list position, after edits reorder the list.
///
/// Positions past [`MAX_MISSION_ITEMS`] wrap; check the length before uploading.
pub fn renumber(items: &mut [MissionItem]) {
    for (idx, item) in items.iter_mut().enumerate() {
        item.seq = idx as u16;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MissionPhase {
    #[default]
    Idle,
    Uploading,
    Downloading,
    Completed,
    Failed,
}

/// Progress of the current (or last) mission transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MissionState {
    pub phase: MissionPhase,
    pub current: u16,
    pub total: u16,
    pub error: Option<String>,
}

impl MissionState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn uploading(current: u16, total: u16) -> Self {
        Self { phase: MissionPhase::Uploading, current, total, error: None }
    }

    pub fn downloading(current: u16, total: u16) -> Self {
        Self { phase: MissionPhase::Downloading, current, total, error: None }
    }

    pub fn completed(current: u16, total: u16) -> Self {
        Self { phase: MissionPhase::Completed, current, total, error: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { phase: MissionPhase::Failed, current: 0, total: 0, error: Some(reason.into()) }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, MissionPhase::Uploading | MissionPhase::Downloading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_relative_altitude_waypoint() {
        let item = MissionItem::waypoint(3, 47.0, 8.0, 100.0);
        assert_eq!(item.command, MavCmd::WAYPOINT);
        assert_eq!(item.frame, 3);
        assert!(item.autocontinue);
        assert_eq!(item.acceptance_radius(), 10.0);

        let tight = MissionItem { param2: 2.5, ..item };
        assert_eq!(tight.acceptance_radius(), 2.5);
    }

    #[test]
    fn renumber_follows_position() {
        let mut items = vec![
            MissionItem::waypoint(5, 0.0, 0.0, 10.0),
            MissionItem::waypoint(2, 0.0, 0.0, 20.0).with_command(MavCmd::LAND),
        ];
        renumber(&mut items);
        assert_eq!(items.iter().map(|i| i.seq).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn scaled_coordinates() {
        let item = MissionItem::waypoint(0, -35.3632621, 149.1652374, 50.0);
        assert_eq!(item.latitude_e7(), -353_632_621);
        assert_eq!(item.longitude_e7(), 1_491_652_374);
    }
}
