//! Vehicle state aggregation.

use std::sync::Arc;

use crate::notify::{DeliveryContext, Publisher};
use crate::types::{
    AttitudeState, BatteryState, ConnectionState, HeartbeatState, PositionState, VehicleState,
    VfrHudState,
};

/// Folds per-message telemetry into one [`VehicleState`] snapshot.
///
/// Each `apply_*` replaces exactly one slot (heartbeats touch mode and armed flag)
/// and publishes the new snapshot.
#[derive(Debug)]
pub struct VehicleStateStore {
    publisher: Publisher<Arc<VehicleState>>,
}

impl VehicleStateStore {
    pub fn new(context: Arc<dyn DeliveryContext>) -> Self {
        Self { publisher: Publisher::new(Arc::new(VehicleState::default()), context) }
    }

    pub fn current(&self) -> Arc<VehicleState> {
        self.publisher.current()
    }

    pub fn publisher(&self) -> &Publisher<Arc<VehicleState>> {
        &self.publisher
    }

    fn modify(&self, f: impl FnOnce(&mut VehicleState)) -> Arc<VehicleState> {
        self.publisher
            .update(|current| {
                let mut next = VehicleState::clone(current);
                f(&mut next);
                Some(Arc::new(next))
            })
            .unwrap_or_else(|| self.current())
    }

    pub fn apply_connection(&self, connection: ConnectionState) -> Arc<VehicleState> {
        self.modify(|s| s.connection = Some(connection))
    }

    /// Flight mode is replaced only when the heartbeat's custom mode is recognised.
    pub fn apply_heartbeat(&self, heartbeat: &HeartbeatState) -> Arc<VehicleState> {
        self.modify(|s| {
            if let Some(mode) = heartbeat.flight_mode() {
                s.flight_mode = Some(mode);
            }
            s.armed = Some(heartbeat.is_armed());
        })
    }

    pub fn apply_attitude(&self, attitude: AttitudeState) -> Arc<VehicleState> {
        self.modify(|s| s.attitude = Some(attitude))
    }

    pub fn apply_position(&self, position: PositionState) -> Arc<VehicleState> {
        self.modify(|s| s.position = Some(position))
    }

    pub fn apply_vfr_hud(&self, hud: VfrHudState) -> Arc<VehicleState> {
        self.modify(|s| s.vfr_hud = Some(hud))
    }

    pub fn apply_battery(&self, battery: BatteryState) -> Arc<VehicleState> {
        self.modify(|s| s.battery = Some(battery))
    }

    /// Drop all telemetry, e.g. when the session stops.
    pub fn clear(&self) -> Arc<VehicleState> {
        self.modify(|s| *s = VehicleState::default())
    }
}
