//! COMMAND_LONG requests and their acknowledgement outcomes.

use serde::Serialize;

use super::mav_flags::{command, mav_result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandLong {
    pub command: u16,
    pub params: [f32; 7],
    pub confirmation: u8,
}

impl CommandLong {
    pub fn new(command: u16) -> Self {
        Self { command, params: [0.0; 7], confirmation: 0 }
    }

    pub fn with_params(mut self, params: [f32; 7]) -> Self {
        self.params = params;
        self
    }

    /// MAV_CMD_COMPONENT_ARM_DISARM with param1 = 1 (arm) or 0 (disarm).
    pub fn arm_disarm(arm: bool) -> Self {
        let mut params = [0.0; 7];
        params[0] = if arm { 1.0 } else { 0.0 };
        Self::new(command::COMPONENT_ARM_DISARM).with_params(params)
    }
}

/// Outcome of a command that waits for COMMAND_ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandAckResult {
    Accepted,
    Temporary,
    Denied,
    Unsupported,
    Failed,
    InProgress,
    Timeout,
}

impl CommandAckResult {
    /// Map a MAV_RESULT code; unknown codes count as failures.
    pub fn from_mav_result(result: u8) -> Self {
        match result {
            mav_result::ACCEPTED => CommandAckResult::Accepted,
            mav_result::TEMPORARILY_REJECTED => CommandAckResult::Temporary,
            mav_result::DENIED => CommandAckResult::Denied,
            mav_result::UNSUPPORTED => CommandAckResult::Unsupported,
            mav_result::FAILED => CommandAckResult::Failed,
            mav_result::IN_PROGRESS => CommandAckResult::InProgress,
            _ => CommandAckResult::Failed,
        }
    }

    pub fn is_success(self) -> bool {
        self == CommandAckResult::Accepted
    }
}

/// A COMMAND_ACK as observed on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandAck {
    pub command: u16,
    pub result: CommandAckResult,
    pub raw_result: u8,
    pub system_id: u8,
    pub component_id: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mav_result_mapping() {
        assert_eq!(CommandAckResult::from_mav_result(0), CommandAckResult::Accepted);
        assert_eq!(CommandAckResult::from_mav_result(1), CommandAckResult::Temporary);
        assert_eq!(CommandAckResult::from_mav_result(2), CommandAckResult::Denied);
        assert_eq!(CommandAckResult::from_mav_result(3), CommandAckResult::Unsupported);
        assert_eq!(CommandAckResult::from_mav_result(4), CommandAckResult::Failed);
        assert_eq!(CommandAckResult::from_mav_result(5), CommandAckResult::InProgress);
        assert_eq!(CommandAckResult::from_mav_result(6), CommandAckResult::Failed);
        assert_eq!(CommandAckResult::from_mav_result(200), CommandAckResult::Failed);
    }

    #[test]
    fn arm_disarm_params() {
        assert_eq!(CommandLong::arm_disarm(true).params[0], 1.0);
        assert_eq!(CommandLong::arm_disarm(false).params[0], 0.0);
        assert_eq!(CommandLong::arm_disarm(true).command, 400);
    }
}
