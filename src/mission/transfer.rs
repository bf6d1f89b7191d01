//! Mission upload/download state machine.
//!
//! The machine is sans-IO: message handlers feed it what the vehicle sent and get
//! back what should be sent in reply. The session owns the timers (clear delay,
//! download timeout) and performs the actual sends.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::MissionOutbound;
use crate::notify::{DeliveryContext, Publisher};
use crate::types::mav_flags::mission_result;
use crate::types::{MAX_MISSION_ITEMS, MissionItem, MissionState, renumber};
use crate::{LinkError, Result};

pub type DownloadReply = oneshot::Receiver<Result<Vec<MissionItem>>>;

#[derive(Debug)]
enum Transfer {
    Idle,
    Uploading {
        items: Arc<[MissionItem]>,
        last_sent: Option<u16>,
    },
    Downloading {
        expected: Option<u16>,
        items: Vec<MissionItem>,
        reply: oneshot::Sender<Result<Vec<MissionItem>>>,
    },
}

#[derive(Debug)]
struct Inner {
    transfer: Transfer,
    generation: u64,
}

/// One transfer at a time; starting a new one abandons the previous.
#[derive(Debug)]
pub struct MissionTransfer {
    inner: Mutex<Inner>,
    publisher: Publisher<MissionState>,
}

impl MissionTransfer {
    pub fn new(context: Arc<dyn DeliveryContext>) -> Self {
        Self {
            inner: Mutex::new(Inner { transfer: Transfer::Idle, generation: 0 }),
            publisher: Publisher::new(MissionState::idle(), context),
        }
    }

    pub fn publisher(&self) -> &Publisher<MissionState> {
        &self.publisher
    }

    pub fn current(&self) -> MissionState {
        self.publisher.current()
    }

    /// Enter the uploading state with `items` renumbered in list order. Returns the
    /// generation to pass to [`MissionTransfer::is_current`] after the clear delay.
    ///
    /// A list too long for 16-bit sequence numbers is refused and leaves any running
    /// transfer untouched.
    pub fn begin_upload(&self, mut items: Vec<MissionItem>) -> Result<u64> {
        if items.len() > MAX_MISSION_ITEMS {
            return Err(LinkError::MissionTooLarge { items: items.len(), max: MAX_MISSION_ITEMS });
        }
        renumber(&mut items);
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let total = items.len() as u16;
        Self::abandon(&mut inner.transfer, "Superseded by upload");
        inner.transfer = Transfer::Uploading { items: items.into(), last_sent: None };
        info!(items = total, "Mission upload started");
        self.publisher.publish(MissionState::uploading(0, total));
        Ok(inner.generation)
    }

    /// Enter the downloading state. The receiver resolves when the download ends.
    pub fn begin_download(&self) -> (u64, DownloadReply) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        Self::abandon(&mut inner.transfer, "Superseded by download");
        let (tx, rx) = oneshot::channel();
        inner.transfer = Transfer::Downloading { expected: None, items: Vec::new(), reply: tx };
        info!("Mission download started");
        self.publisher.publish(MissionState::downloading(0, 0));
        (inner.generation, rx)
    }

    /// Whether the transfer started as `generation` is still running.
    pub fn is_current(&self, generation: u64) -> bool {
        let inner = self.inner.lock();
        inner.generation == generation && !matches!(inner.transfer, Transfer::Idle)
    }

    /// Number of items being uploaded, if an upload is running.
    pub fn upload_len(&self) -> Option<u16> {
        match &self.inner.lock().transfer {
            Transfer::Uploading { items, .. } => Some(items.len() as u16),
            _ => None,
        }
    }

    /// Vehicle asked for item `seq` of the upload.
    pub fn on_item_request(&self, seq: u16) -> Option<MissionOutbound> {
        let mut inner = self.inner.lock();
        let Transfer::Uploading { items, last_sent } = &mut inner.transfer else {
            debug!(seq, "Item request outside of an upload");
            return None;
        };
        let Some(item) = items.get(seq as usize) else {
            warn!(seq, total = items.len(), "Vehicle requested an item past the end of the mission");
            return None;
        };
        let mut item = item.clone();
        item.seq = seq;
        *last_sent = Some(seq);
        self.publisher.publish(MissionState::uploading(seq + 1, items.len() as u16));
        Some(MissionOutbound::Item(item))
    }

    /// Vehicle announced how many items it will send.
    pub fn on_count(&self, count: u16) -> Option<MissionOutbound> {
        let mut inner = self.inner.lock();
        let Transfer::Downloading { expected, .. } = &mut inner.transfer else {
            debug!(count, "Mission count outside of a download");
            return None;
        };
        if expected.is_some() {
            debug!(count, "Repeated mission count ignored");
            return None;
        }
        *expected = Some(count);
        self.publisher.publish(MissionState::downloading(0, count));

        if count > 0 {
            return Some(MissionOutbound::RequestItem(0));
        }
        if let Transfer::Downloading { reply, .. } =
            std::mem::replace(&mut inner.transfer, Transfer::Idle)
        {
            info!("Vehicle has no mission");
            self.publisher.publish(MissionState::completed(0, 0));
            let _ = reply.send(Ok(Vec::new()));
        }
        None
    }

    /// Vehicle sent one mission item.
    pub fn on_item(&self, item: MissionItem) -> Option<MissionOutbound> {
        let mut inner = self.inner.lock();
        let Transfer::Downloading { expected: Some(expected), items, .. } = &mut inner.transfer
        else {
            debug!(seq = item.seq, "Mission item outside of a download");
            return None;
        };
        let expected = *expected;
        let next = items.len() as u16;
        if item.seq != next {
            debug!(seq = item.seq, wanted = next, "Out-of-order mission item ignored");
            return None;
        }
        items.push(item);
        let received = items.len() as u16;
        self.publisher.publish(MissionState::downloading(received, expected));

        if received < expected {
            return Some(MissionOutbound::RequestItem(received));
        }
        if let Transfer::Downloading { items, reply, .. } =
            std::mem::replace(&mut inner.transfer, Transfer::Idle)
        {
            info!(items = items.len(), "Mission download complete");
            self.publisher.publish(MissionState::completed(received, expected));
            let _ = reply.send(Ok(items));
        }
        Some(MissionOutbound::Ack(mission_result::ACCEPTED))
    }

    /// Vehicle sent MISSION_ACK with `code`.
    pub fn on_ack(&self, code: u8) {
        let mut inner = self.inner.lock();
        if code != mission_result::ACCEPTED {
            if matches!(inner.transfer, Transfer::Idle) {
                debug!(code, "Mission rejection outside of a transfer");
                return;
            }
            let reason = mission_result::reason(code);
            warn!(code, %reason, "Mission transfer rejected");
            let transfer = std::mem::replace(&mut inner.transfer, Transfer::Idle);
            if let Transfer::Downloading { reply, .. } = transfer {
                let _ = reply.send(Err(LinkError::MissionRejected { code, reason: reason.clone() }));
            }
            self.publisher.publish(MissionState::failed(reason));
            return;
        }

        match &inner.transfer {
            Transfer::Uploading { items, last_sent }
                if !items.is_empty() && *last_sent == Some(items.len() as u16 - 1) =>
            {
                let total = items.len() as u16;
                info!(items = total, "Mission upload accepted");
                inner.transfer = Transfer::Idle;
                self.publisher.publish(MissionState::completed(total, total));
            }
            Transfer::Uploading { items, .. } if items.is_empty() => {
                info!("Empty mission accepted");
                inner.transfer = Transfer::Idle;
                self.publisher.publish(MissionState::completed(0, 0));
            }
            _ => debug!("Mission ack with nothing to complete"),
        }
    }

    /// End the transfer started as `generation` with a failure, if it is still running.
    pub fn fail_if_current(&self, generation: u64, reason: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation || matches!(inner.transfer, Transfer::Idle) {
            return false;
        }
        Self::abandon(&mut inner.transfer, reason);
        inner.transfer = Transfer::Idle;
        warn!(reason, "Mission transfer failed");
        self.publisher.publish(MissionState::failed(reason));
        true
    }

    /// Stop whatever is running.
    pub fn abort(&self, reason: &str) {
        let mut inner = self.inner.lock();
        if matches!(inner.transfer, Transfer::Idle) {
            return;
        }
        Self::abandon(&mut inner.transfer, reason);
        inner.transfer = Transfer::Idle;
        self.publisher.publish(MissionState::failed(reason));
    }

    fn abandon(transfer: &mut Transfer, reason: &str) {
        if let Transfer::Downloading { reply, .. } = std::mem::replace(transfer, Transfer::Idle) {
            let _ = reply.send(Err(LinkError::cancelled(format!("mission download ({reason})"))));
        }
    }
}
