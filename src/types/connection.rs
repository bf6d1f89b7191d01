//! Link-level states.

use serde::Serialize;
use tokio::time::Instant;

/// Heartbeat-derived view of the remote vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub system_id: u8,
    pub component_id: u8,
    pub last_heartbeat: Option<Instant>,
}

impl ConnectionState {
    /// `(system_id, component_id)` of the connected vehicle.
    pub fn target(&self) -> Option<(u8, u8)> {
        self.is_connected.then_some((self.system_id, self.component_id))
    }
}

/// Lifecycle of the underlying byte transport.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum TransportState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl TransportState {
    pub fn is_connected(&self) -> bool {
        matches!(self, TransportState::Connected)
    }
}
