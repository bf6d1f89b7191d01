//! Aggregated vehicle snapshot.

use super::{
    AttitudeState, BatteryState, ConnectionState, FlightMode, PositionState, VfrHudState,
};

/// Latest known value of every telemetry slot.
///
/// Slots are `None` until the first corresponding message arrives. Snapshots are
/// immutable; the state store publishes a fresh `Arc<VehicleState>` per change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleState {
    pub connection: Option<ConnectionState>,
    pub attitude: Option<AttitudeState>,
    pub position: Option<PositionState>,
    pub vfr_hud: Option<VfrHudState>,
    pub battery: Option<BatteryState>,
    pub flight_mode: Option<FlightMode>,
    pub armed: Option<bool>,
}

impl VehicleState {
    pub fn is_connected(&self) -> bool {
        self.connection.is_some_and(|c| c.is_connected)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.unwrap_or(false)
    }
}
