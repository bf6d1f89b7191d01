//! Presentation-facing streams over published snapshots and broadcast events.

mod throttle;

pub use throttle::{Throttle, ThrottleExt};

use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tracing::debug;

use crate::types::UpdateRate;

/// Snapshot stream starting with the current value, optionally rate limited.
pub fn snapshot_stream<T>(
    rx: watch::Receiver<T>,
    rate: UpdateRate,
) -> impl Stream<Item = T> + Send + 'static
where
    T: Clone + Send + Sync + 'static,
{
    let snapshots = WatchStream::new(rx);
    match rate.throttle_interval() {
        None => snapshots.boxed(),
        Some(interval) => snapshots.throttle(interval).boxed(),
    }
}

/// Event stream that skips over events a slow consumer missed.
pub fn event_stream<T>(rx: broadcast::Receiver<T>) -> impl Stream<Item = T> + Send + 'static
where
    T: Clone + Send + 'static,
{
    BroadcastStream::new(rx).filter_map(|event| async move {
        match event {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                debug!(missed, "Event subscriber lagged");
                None
            }
        }
    })
}
