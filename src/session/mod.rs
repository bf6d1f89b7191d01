//! The vehicle session: one link to one autopilot.
//!
//! A [`Session`] owns the transport, the protocol pipeline and every tracker. It
//! exposes three kinds of output:
//!
//! - snapshot getters (`vehicle_state()`, `health()`, ...) for the latest value,
//! - snapshot streams (`vehicle_updates(rate)`, ...) and [`Publishers`] for
//!   observer callbacks delivered through the session's [`DeliveryContext`],
//! - event streams (`autopilot_messages()`, `command_acks()`, ...) for things that
//!   happen rather than change.
//!
//! Commands require a connected vehicle and fail with [`LinkError::NotConnected`]
//! otherwise.

pub(crate) mod core;
pub(crate) mod handlers;

use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use self::core::LinkCore;
use crate::config::GcsConfig;
use crate::driver::{Driver, DriverHandle};
use crate::link::CommandKey;
use crate::mission::MissionOutbound;
use crate::notify::{DeliveryContext, Immediate, Publisher};
use crate::protocol::{Value, ids};
use crate::stream::{event_stream, snapshot_stream};
use crate::transport::{Transport, event_channel};
use crate::types::mav_flags::{base_mode, param_type};
use crate::types::{
    AlertState, AutopilotMessage, CommandAck, CommandAckResult, CommandLong, ConnectionState,
    FlightMode, HealthState, MAX_MISSION_ITEMS, MissionItem, MissionState, ParamValue,
    PreflightReport, RcChannels, TransportState, UpdateRate, VehicleState,
};
use crate::{LinkError, Result};

/// Borrowed view of every snapshot publisher, for observer registration.
#[derive(Debug, Clone, Copy)]
pub struct Publishers<'a> {
    pub vehicle: &'a Publisher<Arc<VehicleState>>,
    pub connection: &'a Publisher<ConnectionState>,
    pub health: &'a Publisher<HealthState>,
    pub alerts: &'a Publisher<Vec<AlertState>>,
    pub preflight: &'a Publisher<PreflightReport>,
    pub mission: &'a Publisher<MissionState>,
    pub transport: &'a Publisher<TransportState>,
}

pub struct Session {
    core: Arc<LinkCore>,
    transport: Arc<dyn Transport>,
    driver: Mutex<Option<DriverHandle>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport.describe())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Session {
    /// Start a session delivering observer callbacks inline.
    pub async fn start<T: Transport>(transport: T, config: GcsConfig) -> Result<Self> {
        Self::start_with_context(Arc::new(transport), config, Arc::new(Immediate)).await
    }

    /// Start a session delivering observer callbacks through `context`.
    pub async fn start_with_context(
        transport: Arc<dyn Transport>,
        config: GcsConfig,
        context: Arc<dyn DeliveryContext>,
    ) -> Result<Self> {
        config.validate()?;
        let description = transport.describe();
        info!(transport = %description, "Starting vehicle session");

        let (core, outbox) = LinkCore::new(config, context);
        let core = Arc::new(core);
        let dispatcher = handlers::dispatcher(&core)?;

        core.transport_state.publish(TransportState::Connecting);
        let (events, event_rx) = event_channel();
        if let Err(e) = transport.start(events).await {
            warn!(transport = %description, "Transport failed to start: {}", e);
            core.transport_state.publish(TransportState::Error(e.to_string()));
            return Err(e);
        }
        core.transport_state.publish(TransportState::Connected);

        let driver = Driver::spawn(core.clone(), transport.clone(), dispatcher, event_rx, outbox);
        info!(transport = %description, "Vehicle session running");
        Ok(Self { core, transport, driver: Mutex::new(Some(driver)) })
    }

    pub fn is_running(&self) -> bool {
        self.driver.lock().as_ref().is_some_and(|d| !d.is_cancelled())
    }

    /// Stop the background tasks and the transport, releasing every in-flight
    /// operation. Calling it again is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let Some(driver) = self.driver.lock().take() else {
            return Ok(());
        };
        info!("Stopping vehicle session");
        driver.shutdown().await;
        let stopped = self.transport.stop().await;
        self.core.reset("Session stopped");
        self.core.transport_state.publish(TransportState::Disconnected);
        info!("Vehicle session stopped");
        stopped
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() { Ok(()) } else { Err(LinkError::NotStarted) }
    }

    fn target(&self) -> Result<(u8, u8)> {
        self.ensure_running()?;
        self.core.target()
    }

    async fn send(&self, message_id: u32, values: &[(&str, Value)]) -> Result<()> {
        self.transport.send(self.core.encode(message_id, values)).await
    }

    async fn send_mission(&self, outbound: MissionOutbound, target: (u8, u8)) -> Result<()> {
        let frame = outbound.encode(&self.core.encoder, target.0, target.1);
        self.transport.send(frame).await
    }

    // Snapshots

    pub fn vehicle_state(&self) -> Arc<VehicleState> {
        self.core.state.current()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.core.connection.publisher().current()
    }

    pub fn health(&self) -> HealthState {
        self.core.health.current()
    }

    /// One entry per alert type seen so far, active or not.
    pub fn alerts(&self) -> Vec<AlertState> {
        self.core.alerts.current()
    }

    pub fn active_alerts(&self) -> Vec<AlertState> {
        self.core.alerts.active()
    }

    pub fn preflight(&self) -> PreflightReport {
        self.core.preflight.current()
    }

    pub fn mission_state(&self) -> MissionState {
        self.core.mission.current()
    }

    pub fn transport_state(&self) -> TransportState {
        self.core.transport_state.current()
    }

    pub fn publishers(&self) -> Publishers<'_> {
        Publishers {
            vehicle: self.core.state.publisher(),
            connection: self.core.connection.publisher(),
            health: self.core.health.publisher(),
            alerts: self.core.alerts.publisher(),
            preflight: self.core.preflight.publisher(),
            mission: self.core.mission.publisher(),
            transport: &self.core.transport_state,
        }
    }

    // Snapshot streams

    pub fn vehicle_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = Arc<VehicleState>> + Send + 'static {
        snapshot_stream(self.core.state.publisher().watch(), rate)
    }

    pub fn connection_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = ConnectionState> + Send + 'static {
        snapshot_stream(self.core.connection.publisher().watch(), rate)
    }

    pub fn health_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = HealthState> + Send + 'static {
        snapshot_stream(self.core.health.publisher().watch(), rate)
    }

    pub fn alert_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = Vec<AlertState>> + Send + 'static {
        snapshot_stream(self.core.alerts.publisher().watch(), rate)
    }

    pub fn preflight_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = PreflightReport> + Send + 'static {
        snapshot_stream(self.core.preflight.publisher().watch(), rate)
    }

    pub fn mission_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = MissionState> + Send + 'static {
        snapshot_stream(self.core.mission.publisher().watch(), rate)
    }

    pub fn transport_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = TransportState> + Send + 'static {
        snapshot_stream(self.core.transport_state.watch(), rate)
    }

    // Event streams

    /// STATUSTEXT messages from the autopilot.
    pub fn autopilot_messages(&self) -> impl Stream<Item = AutopilotMessage> + Send + 'static {
        event_stream(self.core.events.autopilot_messages.subscribe())
    }

    pub fn rc_channels(&self) -> impl Stream<Item = RcChannels> + Send + 'static {
        event_stream(self.core.events.rc_channels.subscribe())
    }

    /// PARAM_VALUE messages, whether requested or sent spontaneously.
    pub fn parameters(&self) -> impl Stream<Item = ParamValue> + Send + 'static {
        event_stream(self.core.events.parameters.subscribe())
    }

    /// Every COMMAND_ACK, including ones nobody is waiting for.
    pub fn command_acks(&self) -> impl Stream<Item = CommandAck> + Send + 'static {
        event_stream(self.core.events.command_acks.subscribe())
    }

    // Commands

    /// Send COMMAND_LONG without waiting for an acknowledgement.
    pub async fn send_command_long(&self, command: CommandLong) -> Result<()> {
        let (system, component) = self.target()?;
        debug!(command = command.command, "Sending COMMAND_LONG");
        let [p1, p2, p3, p4, p5, p6, p7] = command.params;
        self.send(
            ids::COMMAND_LONG,
            &[
                ("param1", p1.into()),
                ("param2", p2.into()),
                ("param3", p3.into()),
                ("param4", p4.into()),
                ("param5", p5.into()),
                ("param6", p6.into()),
                ("param7", p7.into()),
                ("command", command.command.into()),
                ("target_system", system.into()),
                ("target_component", component.into()),
                ("confirmation", command.confirmation.into()),
            ],
        )
        .await
    }

    /// Send COMMAND_LONG and wait for the matching COMMAND_ACK.
    ///
    /// Resolves with [`CommandAckResult::Timeout`] when no ack arrives within the
    /// configured window. Dropping the future releases the pending slot.
    pub async fn command_with_ack(&self, command: CommandLong) -> Result<CommandAckResult> {
        let (system, component) = self.target()?;
        let pending = self.core.acks.register(CommandKey::new(command.command, system, component));
        self.send_command_long(command).await?;
        let result = pending.await?;
        if !result.is_success() {
            warn!(command = command.command, ?result, "Command not accepted");
        }
        Ok(result)
    }

    pub async fn arm(&self) -> Result<CommandAckResult> {
        info!("Arming vehicle");
        self.command_with_ack(CommandLong::arm_disarm(true)).await
    }

    pub async fn disarm(&self) -> Result<CommandAckResult> {
        info!("Disarming vehicle");
        self.command_with_ack(CommandLong::arm_disarm(false)).await
    }

    /// Request a flight mode with SET_MODE. The heartbeat confirms the change.
    pub async fn set_flight_mode(&self, mode: FlightMode) -> Result<()> {
        let (system, _) = self.target()?;
        info!(%mode, "Requesting flight mode");
        self.send(
            ids::SET_MODE,
            &[
                ("custom_mode", mode.custom_mode().into()),
                ("target_system", system.into()),
                ("base_mode", base_mode::CUSTOM_MODE_ENABLED.into()),
            ],
        )
        .await
    }

    /// Ask for one parameter by name. The answer arrives on [`Session::parameters`].
    pub async fn request_parameter(&self, name: &str) -> Result<()> {
        let (system, component) = self.target()?;
        self.send(
            ids::PARAM_REQUEST_READ,
            &[
                ("param_index", Value::Int16(-1)),
                ("target_system", system.into()),
                ("target_component", component.into()),
                ("param_id", name.into()),
            ],
        )
        .await
    }

    /// Write a parameter. The vehicle echoes the stored value as PARAM_VALUE.
    pub async fn set_parameter(&self, name: &str, value: f32) -> Result<()> {
        let (system, component) = self.target()?;
        info!(name, value, "Setting parameter");
        self.send(
            ids::PARAM_SET,
            &[
                ("param_value", value.into()),
                ("target_system", system.into()),
                ("target_component", component.into()),
                ("param_id", name.into()),
                ("param_type", param_type::REAL32.into()),
            ],
        )
        .await
    }

    // Missions

    /// Start uploading `items`, renumbered in list order.
    ///
    /// Returns once MISSION_COUNT is sent; progress and the outcome are published
    /// on [`Session::mission_updates`]. Starting another transfer during the clear
    /// delay abandons this one with [`LinkError::Cancelled`]. More than
    /// [`MAX_MISSION_ITEMS`] items is refused with [`LinkError::MissionTooLarge`]
    /// before anything is sent.
    pub async fn upload_mission(&self, items: Vec<MissionItem>) -> Result<()> {
        let target = self.target()?;
        let total = u16::try_from(items.len()).map_err(|_| LinkError::MissionTooLarge {
            items: items.len(),
            max: MAX_MISSION_ITEMS,
        })?;
        let generation = self.core.mission.begin_upload(items)?;

        if let Err(e) = self.send_mission(MissionOutbound::ClearAll, target).await {
            self.core.mission.fail_if_current(generation, "Failed to send mission clear");
            return Err(e);
        }
        tokio::time::sleep(self.core.config.mission.clear_delay()).await;
        if !self.core.mission.is_current(generation) {
            return Err(LinkError::cancelled("mission upload"));
        }
        if let Err(e) = self.send_mission(MissionOutbound::Count(total), target).await {
            self.core.mission.fail_if_current(generation, "Failed to send mission count");
            return Err(e);
        }
        Ok(())
    }

    /// Download the vehicle's mission.
    ///
    /// Resolves with an empty list, and publishes `Failed("Download timeout")`, when
    /// the vehicle stops answering. Dropping the future abandons the download.
    pub async fn download_mission(&self) -> Result<Vec<MissionItem>> {
        let target = self.target()?;
        let (generation, reply) = self.core.mission.begin_download();
        let _guard = DownloadGuard { core: &self.core, generation };

        self.send_mission(MissionOutbound::RequestList, target).await?;

        let limit = self.core.config.mission.download_timeout();
        match timeout(limit, reply).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(LinkError::cancelled("mission download")),
            Err(_) => {
                self.core.mission.fail_if_current(generation, "Download timeout");
                Ok(Vec::new())
            }
        }
    }
}

/// Fails the download it guards if the caller goes away first. A finished or
/// superseded transfer is left alone.
struct DownloadGuard<'a> {
    core: &'a LinkCore,
    generation: u64,
}

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        self.core.mission.fail_if_current(self.generation, "Download cancelled");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            driver.cancel();
            self.core.acks.cancel_all();
            let transport = self.transport.clone();
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    let _ = transport.stop().await;
                });
            }
        }
    }
}
