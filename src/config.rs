//! Session configuration.
//!
//! Every field has a default, so an empty document (or [`GcsConfig::default`]) gives
//! a working setup. Durations are written in milliseconds:
//!
//! ```yaml
//! link:
//!   heartbeat_timeout_ms: 5000
//! alerts:
//!   position_stale_severity: Critical
//! identity:
//!   system_id: 254
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alerts::AlertPolicy;
use crate::health::HealthPolicy;
use crate::preflight::PreflightPolicy;
use crate::protocol::frame_buffer::{DEFAULT_CAPACITY, MIN_CAPACITY};
use crate::{LinkError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcsConfig {
    pub link: LinkConfig,
    pub mission: MissionConfig,
    pub health: HealthConfig,
    pub alerts: AlertPolicy,
    pub preflight: PreflightConfig,
    pub identity: IdentityConfig,
    pub reassembler: ReassemblerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub heartbeat_timeout_ms: u64,
    pub command_ack_timeout_ms: u64,
    /// Period of the connection-timeout and command-ack sweep.
    pub tick_interval_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { heartbeat_timeout_ms: 3000, command_ack_timeout_ms: 3000, tick_interval_ms: 200 }
    }
}

impl LinkConfig {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn command_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.command_ack_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub download_timeout_ms: u64,
    /// Pause between MISSION_CLEAR_ALL and MISSION_COUNT on upload.
    pub clear_delay_ms: u64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self { download_timeout_ms: 10_000, clear_delay_ms: 200 }
    }
}

impl MissionConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn clear_delay(&self) -> Duration {
        Duration::from_millis(self.clear_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub heartbeat_timeout_ms: u64,
    pub attitude_stale_after_ms: u64,
    pub position_stale_after_ms: u64,
    pub evaluate_interval_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 3000,
            attitude_stale_after_ms: 1000,
            position_stale_after_ms: 2000,
            evaluate_interval_ms: 200,
        }
    }
}

impl HealthConfig {
    pub fn policy(&self) -> HealthPolicy {
        HealthPolicy {
            heartbeat_timeout: Duration::from_millis(self.heartbeat_timeout_ms),
            attitude_stale_after: Duration::from_millis(self.attitude_stale_after_ms),
            position_stale_after: Duration::from_millis(self.position_stale_after_ms),
        }
    }

    pub fn evaluate_interval(&self) -> Duration {
        Duration::from_millis(self.evaluate_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreflightConfig {
    pub min_battery_voltage: f32,
    pub min_battery_percent: i32,
    pub evaluate_interval_ms: u64,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        let policy = PreflightPolicy::default();
        Self {
            min_battery_voltage: policy.min_battery_voltage,
            min_battery_percent: policy.min_battery_percent,
            evaluate_interval_ms: 500,
        }
    }
}

impl PreflightConfig {
    pub fn policy(&self) -> PreflightPolicy {
        PreflightPolicy {
            min_battery_voltage: self.min_battery_voltage,
            min_battery_percent: self.min_battery_percent,
        }
    }

    pub fn evaluate_interval(&self) -> Duration {
        Duration::from_millis(self.evaluate_interval_ms)
    }
}

/// Identity stamped on every outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub system_id: u8,
    pub component_id: u8,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { system_id: 255, component_id: 190 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReassemblerConfig {
    pub capacity: usize,
}

impl Default for ReassemblerConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

impl GcsConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| LinkError::config_with_source("invalid configuration YAML", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| LinkError::io(format!("reading config {}", path.display()), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| LinkError::config_with_source("failed to serialize configuration", e))
    }

    /// Reject values that would stall the periodic loops or the reassembler.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("link.tick_interval_ms", self.link.tick_interval_ms),
            ("health.evaluate_interval_ms", self.health.evaluate_interval_ms),
            ("preflight.evaluate_interval_ms", self.preflight.evaluate_interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(LinkError::config(format!("{name} must be greater than zero")));
        }
        if self.reassembler.capacity < MIN_CAPACITY {
            return Err(LinkError::config(format!(
                "reassembler.capacity must be at least {} bytes",
                MIN_CAPACITY
            )));
        }
        Ok(())
    }
}
