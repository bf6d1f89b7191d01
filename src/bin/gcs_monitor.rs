//! Connect to a vehicle and log what it reports.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use gcslink::{Gcs, GcsConfig, Session, UpdateRate};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gcs-monitor", version, about = "Watch a MAVLink vehicle from the command line")]
struct Cli {
    /// YAML configuration file; defaults apply when omitted.
    #[arg(long, value_name = "PATH", env = "GCS_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `gcslink=debug`.
    #[arg(long, value_name = "FILTER", default_value = "info", env = "GCS_LOG")]
    log: String,

    /// Maximum vehicle snapshots per second.
    #[arg(long, value_name = "HZ", default_value_t = 2)]
    rate: u32,

    /// Download and print the mission once connected.
    #[arg(long)]
    download_mission: bool,

    #[command(subcommand)]
    link: Link,
}

#[derive(Subcommand, Debug)]
enum Link {
    /// Connect to a TCP endpoint such as SITL.
    Tcp {
        #[arg(value_name = "HOST:PORT", default_value = "127.0.0.1:5760")]
        address: String,
    },
    /// Bind a UDP port; replies go to `--remote` or to the last sender.
    Udp {
        #[arg(value_name = "BIND", default_value = "0.0.0.0:14550")]
        bind: String,
        #[arg(long, value_name = "HOST:PORT")]
        remote: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&cli.log)).with_target(false).init();

    let config = match &cli.config {
        Some(path) => GcsConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => GcsConfig::default(),
    };

    let session = match &cli.link {
        Link::Tcp { address } => Gcs::connect_tcp(address.clone(), config).await,
        Link::Udp { bind, remote: Some(remote) } => Gcs::connect_udp(bind.clone(), *remote, config).await,
        Link::Udp { bind, remote: None } => Gcs::listen_udp(bind.clone(), config).await,
    }
    .context("starting session")?;

    tokio::select! {
        result = monitor(&session, cli.rate, cli.download_mission) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    session.stop().await.context("stopping session")?;
    Ok(())
}

async fn monitor(session: &Session, rate: u32, download_mission: bool) -> anyhow::Result<()> {
    let mut vehicle = Box::pin(session.vehicle_updates(UpdateRate::Max(rate)));
    let mut alerts = Box::pin(session.alert_updates(UpdateRate::Native));
    let mut preflight = Box::pin(session.preflight_updates(UpdateRate::Native));
    let mut messages = Box::pin(session.autopilot_messages());
    let mut connection = Box::pin(session.connection_updates(UpdateRate::Native));
    let mut mission_done = !download_mission;

    loop {
        tokio::select! {
            Some(state) = vehicle.next() => {
                let mode = state.flight_mode.map(|m| m.name()).unwrap_or("?");
                match (state.position, state.battery) {
                    (Some(p), battery) => info!(
                        mode,
                        armed = state.is_armed(),
                        lat = p.latitude,
                        lon = p.longitude,
                        alt = p.relative_altitude,
                        volts = battery.map(|b| b.voltage),
                        "Vehicle"
                    ),
                    (None, _) => info!(mode, armed = state.is_armed(), "Vehicle (no position)"),
                }
            }
            Some(link) = connection.next() => {
                if link.is_connected && !mission_done {
                    mission_done = true;
                    let items = session.download_mission().await.context("downloading mission")?;
                    info!(items = items.len(), "Mission downloaded");
                    for item in items {
                        info!(
                            seq = item.seq,
                            command = item.command,
                            lat = item.latitude,
                            lon = item.longitude,
                            alt = item.altitude,
                            "Mission item"
                        );
                    }
                }
            }
            Some(current) = alerts.next() => {
                for alert in current.iter().filter(|a| a.active) {
                    warn!(severity = ?alert.severity, "{}", alert.alert_type.description());
                }
            }
            Some(report) = preflight.next() => {
                for check in &report.checks {
                    info!(check = check.name, status = ?check.status, reason = check.reason, "Preflight");
                }
            }
            Some(message) = messages.next() => {
                info!(severity = ?message.severity, "{}", message.text);
            }
            else => return Ok(()),
        }
    }
}
