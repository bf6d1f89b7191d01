//! Driver spawns and manages the session's background tasks
//!
//! One ingest task owns the reassembler and dispatcher, one writer task drains the
//! outbox into the transport, and three periodic loops drive the timers. All of
//! them share a single [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::protocol::{Dispatcher, FrameReassembler, parse};
use crate::session::core::LinkCore;
use crate::transport::{Transport, TransportEvent};
use crate::types::TransportState;

/// Handle over the spawned tasks.
#[derive(Debug)]
pub(crate) struct DriverHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl DriverHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every task and wait for all of them to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Driver task ended abnormally: {}", e);
            }
        }
    }
}

pub(crate) struct Driver;

impl Driver {
    pub fn spawn(
        core: Arc<LinkCore>,
        transport: Arc<dyn Transport>,
        dispatcher: Dispatcher,
        events: mpsc::Receiver<TransportEvent>,
        outbox: mpsc::UnboundedReceiver<Bytes>,
    ) -> DriverHandle {
        let cancel = CancellationToken::new();
        let link_tick = core.config.link.tick_interval();
        let health_tick = core.config.health.evaluate_interval();
        let preflight_tick = core.config.preflight.evaluate_interval();
        let reassembler = FrameReassembler::new(core.config.reassembler.capacity);

        let tasks = vec![
            tokio::spawn(Self::ingest_task(
                core.clone(),
                dispatcher,
                reassembler,
                events,
                cancel.clone(),
            )),
            tokio::spawn(Self::writer_task(core.clone(), transport, outbox, cancel.clone())),
            tokio::spawn(Self::periodic("link", link_tick, cancel.clone(), {
                let core = core.clone();
                move |now| core.on_link_tick(now)
            })),
            tokio::spawn(Self::periodic("health", health_tick, cancel.clone(), {
                let core = core.clone();
                move |now| core.evaluate_health(now)
            })),
            tokio::spawn(Self::periodic("preflight", preflight_tick, cancel.clone(), {
                move |now| core.evaluate_preflight(now)
            })),
        ];

        DriverHandle { cancel, tasks }
    }

    /// Transport events → frames → parsed messages → handlers.
    async fn ingest_task(
        core: Arc<LinkCore>,
        dispatcher: Dispatcher,
        mut reassembler: FrameReassembler,
        mut events: mpsc::Receiver<TransportEvent>,
        cancel: CancellationToken,
    ) {
        info!("Ingest task started");
        let mut frames = 0u64;
        let mut dropped = 0u64;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };

            match event {
                Some(TransportEvent::Data(bytes)) => {
                    core.transport_state.publish_if_changed(TransportState::Connected);
                    for frame in reassembler.push(&bytes) {
                        match parse(&frame) {
                            Ok(message) => {
                                frames += 1;
                                trace!(
                                    "Frame {}: {} from {}:{}",
                                    frames,
                                    message.name(),
                                    message.system_id,
                                    message.component_id
                                );
                                dispatcher.dispatch(&message);
                            }
                            Err(rejection) => {
                                dropped += 1;
                                trace!(%rejection, "Dropped frame");
                            }
                        }
                    }
                }
                Some(TransportEvent::Error(reason)) => {
                    error!("Transport error: {}", reason);
                    reassembler.clear();
                    core.transport_state.publish(TransportState::Error(reason));
                }
                None => {
                    debug!("Transport event channel closed");
                    break;
                }
            }
        }

        info!("Ingest task ended ({} frames, {} dropped)", frames, dropped);
    }

    /// Writes frames queued by handlers, in order.
    async fn writer_task(
        core: Arc<LinkCore>,
        transport: Arc<dyn Transport>,
        mut outbox: mpsc::UnboundedReceiver<Bytes>,
        cancel: CancellationToken,
    ) {
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = outbox.recv() => frame,
            };
            let Some(frame) = frame else { break };
            if let Err(e) = transport.send(frame).await {
                error!("Failed to send queued frame: {}", e);
                core.transport_state.publish(TransportState::Error(e.to_string()));
            }
        }
        debug!("Writer task ended");
    }

    async fn periodic<F>(name: &'static str, period: Duration, cancel: CancellationToken, mut tick: F)
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(loop_name = name, ?period, "Periodic loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                at = timer.tick() => tick(at),
            }
        }
        debug!(loop_name = name, "Periodic loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GcsConfig;
    use crate::notify::Immediate;
    use crate::protocol::{Encoder, ids};
    use crate::session::handlers;
    use crate::transport::{MemoryTransport, event_channel};

    fn spawn() -> (Arc<LinkCore>, DriverHandle, crate::transport::TransportEvents) {
        let (core, outbox) = LinkCore::new(GcsConfig::default(), Arc::new(Immediate));
        let core = Arc::new(core);
        let dispatcher = handlers::dispatcher(&core).expect("dispatcher");
        let (transport, _peer) = MemoryTransport::pair();
        let (events, rx) = event_channel();
        let handle = Driver::spawn(core.clone(), Arc::new(transport), dispatcher, rx, outbox);
        (core, handle, events)
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_then_silence_disconnects() {
        let (core, handle, events) = spawn();
        let heartbeat = Encoder::new(1, 1).encode(ids::HEARTBEAT, &[]);

        // Split across two chunks to go through reassembly.
        events.data(heartbeat.slice(..5)).await;
        events.data(heartbeat.slice(5..)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(core.connection.current().is_connected);
        assert!(core.transport_state.current().is_connected());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(!core.connection.current().is_connected);
        assert!(!core.health.current().link_alive);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_is_published_and_recoverable() {
        let (core, handle, events) = spawn();
        events.error("serial unplugged").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(core.transport_state.current(), TransportState::Error("serial unplugged".into()));

        events.data(Encoder::new(1, 1).encode(ids::HEARTBEAT, &[])).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(core.transport_state.current(), TransportState::Connected);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_every_task() {
        let (_core, handle, events) = spawn();
        handle.cancel();
        assert!(handle.is_cancelled());
        handle.shutdown().await;
        assert!(events.is_closed());
    }
}
