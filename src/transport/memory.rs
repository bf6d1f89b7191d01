//! In-process transport for tests and demos.
//!
//! [`MemoryTransport::pair`] returns the session side and a [`MemoryPeer`] that
//! plays the vehicle: it injects bytes, observes what the session sent and can
//! simulate transport faults.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Transport, TransportEvents};
use crate::{LinkError, Result};

#[derive(Debug, Default)]
struct Shared {
    events: Option<TransportEvents>,
    starts: usize,
}

#[derive(Debug)]
pub struct MemoryTransport {
    shared: Arc<Mutex<Shared>>,
    sent: mpsc::UnboundedSender<Bytes>,
}

/// Vehicle end of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryPeer {
    shared: Arc<Mutex<Shared>>,
    sent: mpsc::UnboundedReceiver<Bytes>,
}

impl MemoryTransport {
    pub fn pair() -> (Self, MemoryPeer) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { shared: shared.clone(), sent: tx }, MemoryPeer { shared, sent: rx })
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn start(&self, events: TransportEvents) -> Result<()> {
        let mut shared = self.shared.lock();
        shared.events = Some(events);
        shared.starts += 1;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.shared.lock().events = None;
        Ok(())
    }

    async fn send(&self, bytes: Bytes) -> Result<()> {
        if self.shared.lock().events.is_none() {
            return Err(LinkError::transport("memory transport is not started"));
        }
        self.sent.send(bytes).map_err(|_| LinkError::transport("memory peer dropped"))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl MemoryPeer {
    fn events(&self) -> Option<TransportEvents> {
        self.shared.lock().events.clone()
    }

    /// Deliver bytes to the session. Returns `false` when it is not listening.
    pub async fn inject(&self, bytes: impl Into<Bytes>) -> bool {
        match self.events() {
            Some(events) => events.data(bytes.into()).await,
            None => false,
        }
    }

    /// Report a transport fault to the session.
    pub async fn fail(&self, reason: &str) -> bool {
        match self.events() {
            Some(events) => events.error(reason).await,
            None => false,
        }
    }

    /// Next frame the session wrote, waiting if none is queued yet.
    pub async fn next_sent(&mut self) -> Option<Bytes> {
        self.sent.recv().await
    }

    /// Next frame the session wrote, if one is already queued.
    pub fn try_next_sent(&mut self) -> Option<Bytes> {
        self.sent.try_recv().ok()
    }

    pub fn is_started(&self) -> bool {
        self.shared.lock().events.is_some()
    }

    /// How many times the session started the transport.
    pub fn start_count(&self) -> usize {
        self.shared.lock().starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{TransportEvent, event_channel};

    #[tokio::test]
    async fn loopback_in_both_directions() {
        let (transport, mut peer) = MemoryTransport::pair();
        assert!(!peer.inject(Bytes::from_static(b"x")).await);
        assert!(transport.send(Bytes::from_static(b"x")).await.is_err());

        let (events, mut rx) = event_channel();
        transport.start(events).await.expect("start");
        assert!(peer.is_started());

        assert!(peer.inject(Bytes::from_static(&[0xFD, 1, 2])).await);
        assert_eq!(rx.recv().await, Some(TransportEvent::Data(Bytes::from_static(&[0xFD, 1, 2]))));

        assert!(peer.fail("cable pulled").await);
        assert_eq!(rx.recv().await, Some(TransportEvent::Error("cable pulled".into())));

        transport.send(Bytes::from_static(b"cmd")).await.expect("send");
        assert_eq!(peer.next_sent().await, Some(Bytes::from_static(b"cmd")));
        assert!(peer.try_next_sent().is_none());

        transport.stop().await.expect("stop");
        assert!(!peer.is_started());
        assert_eq!(peer.start_count(), 1);
    }
}
