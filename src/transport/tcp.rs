//! TCP client transport (e.g. SITL on port 5760 or a telemetry bridge).

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{Transport, TransportEvents};
use crate::{LinkError, Result};

const READ_BUFFER: usize = 4096;

#[derive(Debug)]
pub struct TcpTransport {
    address: String,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    reader: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            writer: tokio::sync::Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    async fn read_loop(mut reader: OwnedReadHalf, events: TransportEvents, cancel: CancellationToken) {
        let mut buf = vec![0u8; READ_BUFFER];
        loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => break,
                read = reader.read(&mut buf) => read,
            };
            match read {
                Ok(0) => {
                    info!("TCP peer closed the connection");
                    events.error("Connection closed by peer").await;
                    break;
                }
                Ok(n) => {
                    if !events.data(Bytes::copy_from_slice(&buf[..n])).await {
                        break;
                    }
                }
                Err(e) => {
                    error!("TCP read failed: {}", e);
                    events.error(format!("TCP read failed: {e}")).await;
                    break;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn start(&self, events: TransportEvents) -> Result<()> {
        let stream = TcpStream::connect(&self.address).await.map_err(|e| {
            LinkError::transport_with_source(format!("failed to connect to {}", self.address), e)
        })?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        *self.writer.lock().await = Some(write_half);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::read_loop(read_half, events, cancel.clone()));
        if let Some((old_cancel, _)) = self.reader.lock().replace((cancel, handle)) {
            old_cancel.cancel();
        }
        info!(address = %self.address, "TCP transport connected");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let reader = self.reader.lock().take();
        if let Some((cancel, handle)) = reader {
            cancel.cancel();
            let _ = handle.await;
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        Ok(())
    }

    async fn send(&self, bytes: Bytes) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| LinkError::transport("TCP transport is not open"))?;
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| LinkError::transport_with_source("TCP write failed", e))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }
}
