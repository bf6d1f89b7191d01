//! Link and data freshness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use crate::notify::{DeliveryContext, Publisher};
use crate::types::{HealthState, VehicleState};

/// Freshness windows; data older than these counts as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub heartbeat_timeout: Duration,
    pub attitude_stale_after: Duration,
    pub position_stale_after: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(3),
            attitude_stale_after: Duration::from_secs(1),
            position_stale_after: Duration::from_secs(2),
        }
    }
}

fn fresh(received_at: Option<Instant>, now: Instant, window: Duration) -> bool {
    received_at.is_some_and(|at| now.saturating_duration_since(at) <= window)
}

/// Pure evaluation of `state` at `now`.
pub fn evaluate_health(state: &VehicleState, policy: &HealthPolicy, now: Instant) -> HealthState {
    let heartbeat = state.connection.filter(|c| c.is_connected).and_then(|c| c.last_heartbeat);
    HealthState {
        link_alive: fresh(heartbeat, now, policy.heartbeat_timeout),
        attitude_fresh: fresh(state.attitude.map(|a| a.received_at), now, policy.attitude_stale_after),
        position_fresh: fresh(state.position.map(|p| p.received_at), now, policy.position_stale_after),
        evaluated_at: now,
    }
}

/// Publishes a [`HealthState`] whenever one of its verdicts flips.
#[derive(Debug)]
pub struct HealthMonitor {
    policy: HealthPolicy,
    publisher: Publisher<HealthState>,
}

impl HealthMonitor {
    pub fn new(policy: HealthPolicy, context: Arc<dyn DeliveryContext>) -> Self {
        Self { policy, publisher: Publisher::new(HealthState::unhealthy(Instant::now()), context) }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    pub fn current(&self) -> HealthState {
        self.publisher.current()
    }

    pub fn publisher(&self) -> &Publisher<HealthState> {
        &self.publisher
    }

    /// Re-evaluate; returns the new state only if it was published.
    pub fn evaluate(&self, state: &VehicleState, now: Instant) -> Option<HealthState> {
        let next = evaluate_health(state, &self.policy, now);
        let published = self.publisher.update(|current| (!current.same_status(&next)).then_some(next));
        if let Some(health) = published {
            info!(
                link_alive = health.link_alive,
                attitude_fresh = health.attitude_fresh,
                position_fresh = health.position_fresh,
                "Vehicle health changed"
            );
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Immediate;
    use crate::types::{AttitudeState, ConnectionState, PositionState};

    fn attitude(at: Instant) -> AttitudeState {
        AttitudeState {
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            rollspeed: 0.0,
            pitchspeed: 0.0,
            yawspeed: 0.0,
            received_at: at,
        }
    }

    fn position(at: Instant) -> PositionState {
        PositionState {
            latitude: 47.0,
            longitude: 8.0,
            altitude_msl: 500.0,
            relative_altitude: 10.0,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            heading: 90.0,
            received_at: at,
        }
    }

    fn connected(at: Instant) -> ConnectionState {
        ConnectionState { is_connected: true, system_id: 1, component_id: 1, last_heartbeat: Some(at) }
    }

    #[test]
    fn empty_state_is_unhealthy() {
        let health = evaluate_health(&VehicleState::default(), &HealthPolicy::default(), Instant::now());
        assert!(!health.link_alive && !health.attitude_fresh && !health.position_fresh);
    }

    #[test]
    fn freshness_windows() {
        let t0 = Instant::now();
        let state = VehicleState {
            connection: Some(connected(t0)),
            attitude: Some(attitude(t0)),
            position: Some(position(t0)),
            ..VehicleState::default()
        };
        let policy = HealthPolicy::default();

        let health = evaluate_health(&state, &policy, t0 + Duration::from_millis(500));
        assert!(health.all_healthy());

        let health = evaluate_health(&state, &policy, t0 + Duration::from_millis(1500));
        assert!(health.link_alive && !health.attitude_fresh && health.position_fresh);

        let health = evaluate_health(&state, &policy, t0 + Duration::from_millis(3500));
        assert!(!health.link_alive && !health.position_fresh);
    }

    #[test]
    fn disconnected_link_is_not_alive() {
        let t0 = Instant::now();
        let state = VehicleState {
            connection: Some(ConnectionState { is_connected: false, ..connected(t0) }),
            ..VehicleState::default()
        };
        assert!(!evaluate_health(&state, &HealthPolicy::default(), t0).link_alive);
    }

    #[test]
    fn publishes_only_on_change() {
        let monitor = HealthMonitor::new(HealthPolicy::default(), Arc::new(Immediate));
        let t0 = Instant::now();
        let state = VehicleState { attitude: Some(attitude(t0)), ..VehicleState::default() };

        assert!(monitor.evaluate(&state, t0).is_some());
        assert!(monitor.evaluate(&state, t0 + Duration::from_millis(200)).is_none());
        assert!(monitor.evaluate(&state, t0 + Duration::from_millis(400)).is_none());
        let stale = monitor.evaluate(&state, t0 + Duration::from_millis(1200)).expect("flip");
        assert!(!stale.attitude_fresh);
        assert!(monitor.evaluate(&VehicleState::default(), t0).is_none());
    }
}
