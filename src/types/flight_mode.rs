//! ArduPilot Plane flight modes and their `custom_mode` numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightMode {
    Manual,
    Circle,
    Stabilize,
    Training,
    Acro,
    Fbwa,
    Fbwb,
    Cruise,
    Autotune,
    Auto,
    Rtl,
    Loiter,
    Takeoff,
    AvoidAdsb,
    Guided,
    Initialising,
    QStabilize,
    QHover,
    QLoiter,
    QLand,
    QRtl,
}

impl FlightMode {
    pub const ALL: [FlightMode; 21] = [
        FlightMode::Manual,
        FlightMode::Circle,
        FlightMode::Stabilize,
        FlightMode::Training,
        FlightMode::Acro,
        FlightMode::Fbwa,
        FlightMode::Fbwb,
        FlightMode::Cruise,
        FlightMode::Autotune,
        FlightMode::Auto,
        FlightMode::Rtl,
        FlightMode::Loiter,
        FlightMode::Takeoff,
        FlightMode::AvoidAdsb,
        FlightMode::Guided,
        FlightMode::Initialising,
        FlightMode::QStabilize,
        FlightMode::QHover,
        FlightMode::QLoiter,
        FlightMode::QLand,
        FlightMode::QRtl,
    ];

    /// Map a HEARTBEAT `custom_mode`. Unassigned numbers (including 9) yield `None`.
    pub fn from_custom_mode(custom_mode: u32) -> Option<Self> {
        Some(match custom_mode {
            0 => FlightMode::Manual,
            1 => FlightMode::Circle,
            2 => FlightMode::Stabilize,
            3 => FlightMode::Training,
            4 => FlightMode::Acro,
            5 => FlightMode::Fbwa,
            6 => FlightMode::Fbwb,
            7 => FlightMode::Cruise,
            8 => FlightMode::Autotune,
            10 => FlightMode::Auto,
            11 => FlightMode::Rtl,
            12 => FlightMode::Loiter,
            13 => FlightMode::Takeoff,
            14 => FlightMode::AvoidAdsb,
            15 => FlightMode::Guided,
            16 => FlightMode::Initialising,
            17 => FlightMode::QStabilize,
            18 => FlightMode::QHover,
            19 => FlightMode::QLoiter,
            20 => FlightMode::QLand,
            21 => FlightMode::QRtl,
            _ => return None,
        })
    }

    pub fn custom_mode(self) -> u32 {
        match self {
            FlightMode::Manual => 0,
            FlightMode::Circle => 1,
            FlightMode::Stabilize => 2,
            FlightMode::Training => 3,
            FlightMode::Acro => 4,
            FlightMode::Fbwa => 5,
            FlightMode::Fbwb => 6,
            FlightMode::Cruise => 7,
            FlightMode::Autotune => 8,
            FlightMode::Auto => 10,
            FlightMode::Rtl => 11,
            FlightMode::Loiter => 12,
            FlightMode::Takeoff => 13,
            FlightMode::AvoidAdsb => 14,
            FlightMode::Guided => 15,
            FlightMode::Initialising => 16,
            FlightMode::QStabilize => 17,
            FlightMode::QHover => 18,
            FlightMode::QLoiter => 19,
            FlightMode::QLand => 20,
            FlightMode::QRtl => 21,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FlightMode::Manual => "MANUAL",
            FlightMode::Circle => "CIRCLE",
            FlightMode::Stabilize => "STABILIZE",
            FlightMode::Training => "TRAINING",
            FlightMode::Acro => "ACRO",
            FlightMode::Fbwa => "FBWA",
            FlightMode::Fbwb => "FBWB",
            FlightMode::Cruise => "CRUISE",
            FlightMode::Autotune => "AUTOTUNE",
            FlightMode::Auto => "AUTO",
            FlightMode::Rtl => "RTL",
            FlightMode::Loiter => "LOITER",
            FlightMode::Takeoff => "TAKEOFF",
            FlightMode::AvoidAdsb => "AVOID_ADSB",
            FlightMode::Guided => "GUIDED",
            FlightMode::Initialising => "INITIALISING",
            FlightMode::QStabilize => "QSTABILIZE",
            FlightMode::QHover => "QHOVER",
            FlightMode::QLoiter => "QLOITER",
            FlightMode::QLand => "QLAND",
            FlightMode::QRtl => "QRTL",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
