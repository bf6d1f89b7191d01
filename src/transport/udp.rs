//! UDP transport.
//!
//! Binds a local port and talks to either a fixed remote or, when none is given,
//! whichever peer sent the most recent datagram (the usual 14550 listener setup).

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{Transport, TransportEvents};
use crate::{LinkError, Result};

const MAX_DATAGRAM: usize = 65_535;

#[derive(Debug)]
struct Open {
    socket: Arc<UdpSocket>,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

#[derive(Debug)]
pub struct UdpTransport {
    bind: String,
    remote: Option<SocketAddr>,
    peer: Arc<Mutex<Option<SocketAddr>>>,
    open: Mutex<Option<Open>>,
}

impl UdpTransport {
    /// Listen on `bind`, replying to whoever sends to us.
    pub fn listen(bind: impl Into<String>) -> Self {
        Self { bind: bind.into(), remote: None, peer: Arc::new(Mutex::new(None)), open: Mutex::new(None) }
    }

    /// Listen on `bind` and always send to `remote`.
    pub fn connect(bind: impl Into<String>, remote: SocketAddr) -> Self {
        Self {
            bind: bind.into(),
            remote: Some(remote),
            peer: Arc::new(Mutex::new(Some(remote))),
            open: Mutex::new(None),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.open.lock().as_ref().and_then(|open| open.socket.local_addr().ok())
    }

    async fn read_loop(
        socket: Arc<UdpSocket>,
        peer: Arc<Mutex<Option<SocketAddr>>>,
        learn_peer: bool,
        events: TransportEvents,
        cancel: CancellationToken,
    ) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = socket.recv_from(&mut buf) => received,
            };
            match received {
                Ok((n, from)) => {
                    if learn_peer {
                        let mut current = peer.lock();
                        if *current != Some(from) {
                            debug!(%from, "UDP peer learned");
                            *current = Some(from);
                        }
                    }
                    if !events.data(Bytes::copy_from_slice(&buf[..n])).await {
                        break;
                    }
                }
                Err(e) => {
                    // ICMP port-unreachable surfaces here on some platforms; keep reading.
                    error!("UDP receive failed: {}", e);
                    if !events.error(format!("UDP receive failed: {e}")).await {
                        break;
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    async fn start(&self, events: TransportEvents) -> Result<()> {
        let socket = UdpSocket::bind(&self.bind)
            .await
            .map_err(|e| LinkError::transport_with_source(format!("failed to bind {}", self.bind), e))?;
        let socket = Arc::new(socket);
        let cancel = CancellationToken::new();
        let reader = tokio::spawn(Self::read_loop(
            socket.clone(),
            self.peer.clone(),
            self.remote.is_none(),
            events,
            cancel.clone(),
        ));
        info!(bind = %self.bind, remote = ?self.remote, "UDP transport open");
        if let Some(old) = self.open.lock().replace(Open { socket, cancel, reader }) {
            old.cancel.cancel();
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let open = self.open.lock().take();
        if let Some(open) = open {
            open.cancel.cancel();
            let _ = open.reader.await;
        }
        if self.remote.is_none() {
            *self.peer.lock() = None;
        }
        Ok(())
    }

    async fn send(&self, bytes: Bytes) -> Result<()> {
        let socket = self
            .open
            .lock()
            .as_ref()
            .map(|open| open.socket.clone())
            .ok_or_else(|| LinkError::transport("UDP transport is not open"))?;
        let peer = (*self.peer.lock()).ok_or_else(|| LinkError::transport("no UDP peer yet"))?;
        socket
            .send_to(&bytes, peer)
            .await
            .map_err(|e| LinkError::transport_with_source(format!("UDP send to {peer} failed"), e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        match self.remote {
            Some(remote) => format!("udp://{} -> {}", self.bind, remote),
            None => format!("udp://{}", self.bind),
        }
    }
}
