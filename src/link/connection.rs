//! Heartbeat-driven connection detection.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::notify::{DeliveryContext, Publisher};
use crate::types::ConnectionState;

/// Tracks whether a vehicle is heartbeating and which one.
///
/// Publishes a new [`ConnectionState`] only on transitions: first heartbeat,
/// identity change, heartbeat timeout and reset.
#[derive(Debug)]
pub struct ConnectionTracker {
    timeout: Duration,
    state: Mutex<ConnectionState>,
    publisher: Publisher<ConnectionState>,
}

impl ConnectionTracker {
    pub fn new(timeout: Duration, context: Arc<dyn DeliveryContext>) -> Self {
        Self {
            timeout,
            state: Mutex::new(ConnectionState::default()),
            publisher: Publisher::new(ConnectionState::default(), context),
        }
    }

    /// Record a heartbeat. Returns the published state when this was a transition.
    pub fn on_heartbeat(&self, system_id: u8, component_id: u8, at: Instant) -> Option<ConnectionState> {
        let mut state = self.state.lock();
        let was_connected = state.is_connected;
        let identity_changed =
            was_connected && (state.system_id, state.component_id) != (system_id, component_id);

        *state = ConnectionState {
            is_connected: true,
            system_id,
            component_id,
            last_heartbeat: Some(at),
        };

        if !was_connected {
            info!(system_id, component_id, "Vehicle connected");
        } else if identity_changed {
            info!(system_id, component_id, "Vehicle identity changed");
        } else {
            return None;
        }
        self.publisher.publish(*state);
        Some(*state)
    }

    /// Time out a silent vehicle. Returns the published state on disconnect.
    pub fn tick(&self, now: Instant) -> Option<ConnectionState> {
        let mut state = self.state.lock();
        let last = state.last_heartbeat?;
        if !state.is_connected || now.saturating_duration_since(last) <= self.timeout {
            return None;
        }
        state.is_connected = false;
        warn!(
            system_id = state.system_id,
            silent_for = ?now.saturating_duration_since(last),
            "Heartbeat timeout, vehicle disconnected"
        );
        self.publisher.publish(*state);
        Some(*state)
    }

    /// Forget the vehicle, publishing a disconnect if one was connected.
    pub fn reset(&self) -> Option<ConnectionState> {
        let mut state = self.state.lock();
        let was_connected = state.is_connected;
        *state = ConnectionState::default();
        if was_connected {
            info!("Connection tracker reset");
            self.publisher.publish(*state);
            Some(*state)
        } else {
            None
        }
    }

    /// Latest state including the most recent heartbeat time.
    ///
    /// Unlike the published snapshot this refreshes on every heartbeat.
    pub fn current(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn target(&self) -> Option<(u8, u8)> {
        self.current().target()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn publisher(&self) -> &Publisher<ConnectionState> {
        &self.publisher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Immediate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tracker() -> (ConnectionTracker, Arc<AtomicUsize>) {
        let tracker = ConnectionTracker::new(Duration::from_secs(3), Arc::new(Immediate));
        let changes = Arc::new(AtomicUsize::new(0));
        let c = changes.clone();
        tracker.publisher().subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (tracker, changes)
    }

    #[test]
    fn first_heartbeat_connects_once() {
        let (tracker, changes) = tracker();
        let t0 = Instant::now();

        let state = tracker.on_heartbeat(1, 1, t0).expect("transition");
        assert!(state.is_connected);
        assert_eq!(state.target(), Some((1, 1)));
        assert!(tracker.on_heartbeat(1, 1, t0 + Duration::from_secs(1)).is_none());

        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.current().last_heartbeat, Some(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn identity_change_is_published() {
        let (tracker, changes) = tracker();
        let t0 = Instant::now();
        tracker.on_heartbeat(1, 1, t0);
        let state = tracker.on_heartbeat(2, 1, t0).expect("identity change");
        assert_eq!(state.system_id, 2);
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn timeout_boundary() {
        let (tracker, changes) = tracker();
        let t0 = Instant::now();
        tracker.on_heartbeat(1, 1, t0);

        assert!(tracker.tick(t0 + Duration::from_millis(2900)).is_none());
        assert!(tracker.tick(t0 + Duration::from_millis(3000)).is_none());
        let state = tracker.tick(t0 + Duration::from_millis(3100)).expect("timed out");
        assert!(!state.is_connected);
        assert!(tracker.tick(t0 + Duration::from_millis(5000)).is_none());
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reconnect_after_timeout() {
        let (tracker, _) = tracker();
        let t0 = Instant::now();
        tracker.on_heartbeat(1, 1, t0);
        tracker.tick(t0 + Duration::from_secs(4));
        assert!(tracker.on_heartbeat(1, 1, t0 + Duration::from_secs(5)).is_some());
    }

    #[test]
    fn reset_only_publishes_when_connected() {
        let (tracker, changes) = tracker();
        assert!(tracker.reset().is_none());
        tracker.on_heartbeat(1, 1, Instant::now());
        let state = tracker.reset().expect("was connected");
        assert_eq!(state, ConnectionState::default());
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn tick_without_heartbeat_is_noop() {
        let (tracker, changes) = tracker();
        assert!(tracker.tick(Instant::now() + Duration::from_secs(60)).is_none());
        assert_eq!(changes.load(Ordering::SeqCst), 0);
    }
}
