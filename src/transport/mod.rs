//! Byte transports.
//!
//! A transport moves raw bytes and nothing else: no framing, no parsing. Incoming
//! data and faults are pushed into a [`TransportEvents`] sink handed over at
//! [`Transport::start`]; the session's ingest task owns the receiving end.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::Result;

mod memory;
mod tcp;
mod udp;

pub use memory::{MemoryPeer, MemoryTransport};
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

pub use crate::types::TransportState;

/// Capacity of the channel between a transport and the ingest task.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What a transport reports upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Data(Bytes),
    /// Non-fatal fault; the session moves to an error state and stays recoverable.
    Error(String),
}

/// Sending half of the transport → ingest channel.
#[derive(Debug, Clone)]
pub struct TransportEvents {
    tx: mpsc::Sender<TransportEvent>,
}

impl TransportEvents {
    /// Forward received bytes. Returns `false` once the session has gone away.
    pub async fn data(&self, bytes: Bytes) -> bool {
        if bytes.is_empty() {
            return true;
        }
        self.tx.send(TransportEvent::Data(bytes)).await.is_ok()
    }

    pub async fn error(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        debug!(%reason, "Transport reported an error");
        self.tx.send(TransportEvent::Error(reason)).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a connected sink/receiver pair.
pub fn event_channel() -> (TransportEvents, mpsc::Receiver<TransportEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (TransportEvents { tx }, rx)
}

/// Trait for byte-stream links to a vehicle.
///
/// Implementations must tolerate `send` being called concurrently from several
/// tasks and `stop` being called more than once.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the link and begin pushing received bytes into `events`.
    async fn start(&self, events: TransportEvents) -> Result<()>;

    /// Close the link. Background readers must have exited when this returns.
    async fn stop(&self) -> Result<()>;

    /// Write one complete frame.
    async fn send(&self, bytes: Bytes) -> Result<()>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}
