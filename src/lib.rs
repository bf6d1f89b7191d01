//! Vehicle-communication core for a MAVLink 2 ground control station.
//!
//! gcslink keeps a protocol session with an ArduPilot-style autopilot over any byte
//! transport. It reassembles and validates frames, tracks link liveness, correlates
//! commands with their acknowledgements, runs the mission upload/download
//! handshake, and publishes immutable snapshots of vehicle state, health, alerts
//! and preflight readiness for a presentation layer to consume.
//!
//! # Features
//!
//! - **Transports**: TCP, UDP and an in-memory loopback behind one async trait
//! - **Snapshots**: latest-value getters, throttled streams and observer callbacks
//! - **Commands**: COMMAND_LONG with ack tracking, arm/disarm, flight modes, parameters
//! - **Missions**: upload and download with progress reporting and timeouts
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gcslink::{Gcs, GcsConfig, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> gcslink::Result<()> {
//!     let session = Gcs::connect_tcp("127.0.0.1:5760", GcsConfig::default()).await?;
//!     let mut updates = Box::pin(session.vehicle_updates(UpdateRate::Max(4)));
//!
//!     while let Some(state) = updates.next().await {
//!         if let Some(position) = state.position {
//!             println!("{:.6}, {:.6}", position.latitude, position.longitude);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire protocol and transports
pub mod protocol;
pub mod transport;

// Components
pub mod alerts;
pub mod health;
pub mod link;
pub mod mission;
pub mod notify;
pub mod preflight;
pub mod state;

// Session plumbing
pub mod config;
mod driver;
pub mod session;
pub mod stream;

pub use error::*;
pub use types::*;

pub use alerts::{AlertEngine, AlertPolicy};
pub use config::GcsConfig;
pub use health::{HealthMonitor, HealthPolicy};
pub use notify::{DeliveryContext, Immediate, Publisher, SerialContext, SerialRunner};
pub use preflight::{PreflightEvaluator, PreflightPolicy};
pub use session::{Publishers, Session};
pub use transport::{MemoryPeer, MemoryTransport, TcpTransport, Transport, UdpTransport};

use std::net::SocketAddr;

/// Unified entry point for vehicle sessions.
///
/// # Examples
///
/// ## SITL over TCP
/// ```rust,no_run
/// use gcslink::{Gcs, GcsConfig};
///
/// #[tokio::main]
/// async fn main() -> gcslink::Result<()> {
///     let session = Gcs::connect_tcp("127.0.0.1:5760", GcsConfig::default()).await?;
///     session.arm().await?;
///     Ok(())
/// }
/// ```
///
/// ## Telemetry radio bridge over UDP
/// ```rust,no_run
/// use gcslink::{Gcs, GcsConfig};
///
/// #[tokio::main]
/// async fn main() -> gcslink::Result<()> {
///     let session = Gcs::listen_udp("0.0.0.0:14550", GcsConfig::default()).await?;
///     println!("{:?}", session.connection_state());
///     Ok(())
/// }
/// ```
pub struct Gcs;

impl Gcs {
    /// Connect to an autopilot serving MAVLink over TCP.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Transport`] if the connection cannot be established and
    /// [`LinkError::Config`] if `config` is invalid.
    pub async fn connect_tcp(address: impl Into<String>, config: GcsConfig) -> Result<Session> {
        Session::start(TcpTransport::new(address), config).await
    }

    /// Listen on a UDP port and talk to whichever peer sends to it.
    pub async fn listen_udp(bind: impl Into<String>, config: GcsConfig) -> Result<Session> {
        Session::start(UdpTransport::listen(bind), config).await
    }

    /// Bind a UDP port and send to a fixed remote address.
    pub async fn connect_udp(
        bind: impl Into<String>,
        remote: SocketAddr,
        config: GcsConfig,
    ) -> Result<Session> {
        Session::start(UdpTransport::connect(bind, remote), config).await
    }

    /// Start a session over any transport.
    pub async fn start<T: Transport>(transport: T, config: GcsConfig) -> Result<Session> {
        Session::start(transport, config).await
    }
}
