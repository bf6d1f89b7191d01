//! HEARTBEAT `base_mode` bitmask.

use serde::{Deserialize, Serialize};

use super::mav_flags::base_mode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseMode(pub u8);

impl BaseMode {
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    /// Check if any bit of `flag` is set.
    pub fn has_flag(&self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    pub fn is_armed(&self) -> bool {
        self.has_flag(base_mode::SAFETY_ARMED)
    }

    pub fn custom_mode_enabled(&self) -> bool {
        self.has_flag(base_mode::CUSTOM_MODE_ENABLED)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}
