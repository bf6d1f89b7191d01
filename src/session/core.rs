//! Components shared by the session façade, the message handlers and the driver tasks.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::alerts::AlertEngine;
use crate::config::GcsConfig;
use crate::health::HealthMonitor;
use crate::link::{CommandAckTracker, ConnectionTracker};
use crate::mission::{MissionOutbound, MissionTransfer};
use crate::notify::{DeliveryContext, Publisher};
use crate::preflight::PreflightEvaluator;
use crate::protocol::{Encoder, Value};
use crate::state::VehicleStateStore;
use crate::types::{AutopilotMessage, CommandAck, ParamValue, RcChannels, TransportState};
use crate::{LinkError, Result};

/// Buffered events per broadcast subscriber before it starts lagging.
pub(crate) const EVENT_CAPACITY: usize = 64;

/// Fire-and-forget event feeds. Sends with no subscribers are fine.
#[derive(Debug)]
pub(crate) struct EventChannels {
    pub autopilot_messages: broadcast::Sender<AutopilotMessage>,
    pub rc_channels: broadcast::Sender<RcChannels>,
    pub parameters: broadcast::Sender<ParamValue>,
    pub command_acks: broadcast::Sender<CommandAck>,
}

impl EventChannels {
    fn new() -> Self {
        Self {
            autopilot_messages: broadcast::channel(EVENT_CAPACITY).0,
            rc_channels: broadcast::channel(EVENT_CAPACITY).0,
            parameters: broadcast::channel(EVENT_CAPACITY).0,
            command_acks: broadcast::channel(EVENT_CAPACITY).0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct LinkCore {
    pub config: GcsConfig,
    pub encoder: Encoder,
    outbox: mpsc::UnboundedSender<Bytes>,
    pub connection: ConnectionTracker,
    /// Held across a tracker update and the matching vehicle snapshot write.
    connection_sync: Mutex<()>,
    pub acks: CommandAckTracker,
    pub mission: MissionTransfer,
    pub state: VehicleStateStore,
    pub health: HealthMonitor,
    pub alerts: AlertEngine,
    pub preflight: PreflightEvaluator,
    pub transport_state: Publisher<TransportState>,
    pub events: EventChannels,
}

impl LinkCore {
    pub fn new(
        config: GcsConfig,
        context: Arc<dyn DeliveryContext>,
    ) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        let core = Self {
            encoder: Encoder::new(config.identity.system_id, config.identity.component_id),
            outbox,
            connection: ConnectionTracker::new(config.link.heartbeat_timeout(), context.clone()),
            connection_sync: Mutex::new(()),
            acks: CommandAckTracker::new(config.link.command_ack_timeout()),
            mission: MissionTransfer::new(context.clone()),
            state: VehicleStateStore::new(context.clone()),
            health: HealthMonitor::new(config.health.policy(), context.clone()),
            alerts: AlertEngine::new(config.alerts, context.clone()),
            preflight: PreflightEvaluator::new(config.preflight.policy(), context.clone()),
            transport_state: Publisher::new(TransportState::Disconnected, context),
            events: EventChannels::new(),
            config,
        };
        (core, outbox_rx)
    }

    /// `(system_id, component_id)` of the connected vehicle.
    pub fn target(&self) -> Result<(u8, u8)> {
        self.connection.target().ok_or(LinkError::NotConnected)
    }

    pub fn encode(&self, message_id: u32, values: &[(&str, Value)]) -> Bytes {
        self.encoder.encode(message_id, values)
    }

    /// Queue a frame for the writer task. Used from handlers, which must not await.
    pub fn queue(&self, frame: Bytes) {
        if self.outbox.send(frame).is_err() {
            debug!("Outbox closed, dropping frame");
        }
    }

    pub fn queue_mission(&self, outbound: MissionOutbound, system_id: u8, component_id: u8) {
        trace!(?outbound, "Queueing mission reply");
        self.queue(outbound.encode(&self.encoder, system_id, component_id));
    }

    /// Re-run health, alerts and (on a health change) preflight against the current snapshot.
    pub fn evaluate_health(&self, now: Instant) {
        let state = self.state.current();
        let changed = self.health.evaluate(&state, now).is_some();
        let health = self.health.current();
        self.alerts.on_health(&health, now);
        if changed {
            self.preflight.evaluate(&state, &health, now);
        }
    }

    pub fn evaluate_preflight(&self, now: Instant) {
        let state = self.state.current();
        self.preflight.evaluate(&state, &self.health.current(), now);
    }

    /// Telemetry changed the vehicle snapshot.
    pub fn on_state_changed(&self, now: Instant) {
        self.evaluate_health(now);
        self.evaluate_preflight(now);
    }

    /// Record a vehicle heartbeat and refresh the snapshot's connection slot with it.
    pub fn on_heartbeat(&self, system_id: u8, component_id: u8, now: Instant) {
        let _sync = self.connection_sync.lock();
        self.connection.on_heartbeat(system_id, component_id, now);
        self.state.apply_connection(self.connection.current());
    }

    /// Connection timeout and command-ack sweep.
    pub fn on_link_tick(&self, now: Instant) {
        let timed_out = {
            let _sync = self.connection_sync.lock();
            let timed_out = self.connection.tick(now).is_some();
            if timed_out {
                self.state.apply_connection(self.connection.current());
            }
            timed_out
        };
        if timed_out {
            self.on_state_changed(now);
        }
        let expired = self.acks.tick(now);
        if expired > 0 {
            debug!(expired, "Command acks timed out");
        }
    }

    /// Release everything in flight and forget the vehicle.
    pub fn reset(&self, reason: &str) {
        let now = Instant::now();
        {
            let _sync = self.connection_sync.lock();
            self.connection.reset();
            self.state.clear();
        }
        self.acks.cancel_all();
        self.mission.abort(reason);
        self.on_state_changed(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::notify::Immediate;

    fn link_core() -> LinkCore {
        LinkCore::new(GcsConfig::default(), Arc::new(Immediate)).0
    }

    #[test]
    fn link_tick_disconnects_snapshot() {
        let core = link_core();
        let t0 = Instant::now();
        core.on_heartbeat(1, 1, t0);
        assert!(core.state.current().is_connected());

        core.on_link_tick(t0 + Duration::from_millis(2900));
        assert!(core.state.current().is_connected());

        core.on_link_tick(t0 + Duration::from_millis(3100));
        assert!(!core.state.current().is_connected());
        assert!(!core.health.current().link_alive);

        core.on_heartbeat(1, 1, t0 + Duration::from_millis(3200));
        assert!(core.state.current().is_connected());
    }

    #[test]
    fn racing_heartbeats_and_ticks_leave_snapshot_in_sync() {
        let core = link_core();
        let t0 = Instant::now();
        let step = Duration::from_secs(4);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..2000u32 {
                    core.on_heartbeat(1, 1, t0 + step * i);
                }
            });
            scope.spawn(|| {
                for i in 0..2000u32 {
                    core.on_link_tick(t0 + step * i + Duration::from_millis(3500));
                }
            });
        });

        assert_eq!(core.state.current().connection, Some(core.connection.current()));
    }
}
