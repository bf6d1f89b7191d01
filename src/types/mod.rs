//! Domain value types.
//!
//! Everything here is plain data: decoded telemetry, the aggregated
//! [`VehicleState`] snapshot, health/alert/preflight verdicts and mission items.
//! Values carrying a `tokio::time::Instant` record when the ingest task saw the
//! underlying message, so freshness logic works under paused test time.

mod base_mode;
mod command;
mod connection;
mod flight_mode;
mod health;
pub mod mav_flags;
mod mission;
mod telemetry;
mod update_rate;
mod vehicle;

pub use base_mode::BaseMode;
pub use command::{CommandAck, CommandAckResult, CommandLong};
pub use connection::{ConnectionState, TransportState};
pub use flight_mode::FlightMode;
pub use health::{
    AlertSeverity, AlertState, AlertType, HealthState, PreflightCheck, PreflightCheckStatus,
    PreflightReport,
};
pub use mission::{
    DEFAULT_ACCEPTANCE_RADIUS, MAX_MISSION_ITEMS, MavCmd, MissionItem, MissionPhase, MissionState,
    renumber,
};
pub use telemetry::{
    AttitudeState, AutopilotMessage, BatteryState, HeartbeatState, MessageSeverity, ParamValue,
    PositionState, RC_CHANNEL_COUNT, RcChannels, VfrHudState,
};
pub use update_rate::UpdateRate;
pub use vehicle::VehicleState;
