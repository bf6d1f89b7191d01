//! Health, alert and preflight values.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Freshness verdict for the three data streams the operator relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthState {
    pub link_alive: bool,
    pub attitude_fresh: bool,
    pub position_fresh: bool,
    pub evaluated_at: Instant,
}

impl HealthState {
    /// Everything unhealthy, the state before any data arrives.
    pub fn unhealthy(evaluated_at: Instant) -> Self {
        Self { link_alive: false, attitude_fresh: false, position_fresh: false, evaluated_at }
    }

    /// Compare the verdicts only, ignoring when they were computed.
    pub fn same_status(&self, other: &HealthState) -> bool {
        self.link_alive == other.link_alive
            && self.attitude_fresh == other.attitude_fresh
            && self.position_fresh == other.position_fresh
    }

    pub fn all_healthy(&self) -> bool {
        self.link_alive && self.attitude_fresh && self.position_fresh
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AlertType {
    LinkLost,
    AttitudeStale,
    PositionStale,
}

impl AlertType {
    pub const ALL: [AlertType; 3] =
        [AlertType::LinkLost, AlertType::AttitudeStale, AlertType::PositionStale];

    pub fn description(self) -> &'static str {
        match self {
            AlertType::LinkLost => "Telemetry link lost",
            AlertType::AttitudeStale => "Attitude data stale",
            AlertType::PositionStale => "Position data stale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertState {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub active: bool,
    /// When `active` last changed.
    pub changed_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PreflightCheckStatus {
    Passed,
    Failed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreflightCheck {
    pub name: &'static str,
    pub status: PreflightCheckStatus,
    pub reason: Option<&'static str>,
}

impl PreflightCheck {
    pub fn passed(name: &'static str) -> Self {
        Self { name, status: PreflightCheckStatus::Passed, reason: None }
    }

    pub fn failed(name: &'static str, reason: &'static str) -> Self {
        Self { name, status: PreflightCheckStatus::Failed, reason: Some(reason) }
    }

    pub fn unknown(name: &'static str, reason: &'static str) -> Self {
        Self { name, status: PreflightCheckStatus::Unknown, reason: Some(reason) }
    }
}

/// One full preflight evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub checks: Vec<PreflightCheck>,
    pub evaluated_at: Instant,
}

impl PreflightReport {
    pub fn empty(evaluated_at: Instant) -> Self {
        Self { checks: Vec::new(), evaluated_at }
    }

    pub fn all_passed(&self) -> bool {
        !self.checks.is_empty()
            && self.checks.iter().all(|c| c.status == PreflightCheckStatus::Passed)
    }

    pub fn check(&self, name: &str) -> Option<&PreflightCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}
