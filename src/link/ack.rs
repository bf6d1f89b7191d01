//! Correlates COMMAND_LONG requests with their COMMAND_ACK replies.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::types::CommandAckResult;
use crate::{LinkError, Result};

/// Identifies an outstanding command: which command, sent to which vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandKey {
    pub command: u16,
    pub system_id: u8,
    pub component_id: u8,
}

impl CommandKey {
    pub fn new(command: u16, system_id: u8, component_id: u8) -> Self {
        Self { command, system_id, component_id }
    }
}

#[derive(Debug)]
struct Pending {
    generation: u64,
    sent_at: Instant,
    reply: oneshot::Sender<CommandAckResult>,
}

type PendingTable = DashMap<CommandKey, Pending>;

/// At most one outstanding command per [`CommandKey`]; registering again replaces
/// the previous entry, whose waiter then resolves as cancelled.
#[derive(Debug)]
pub struct CommandAckTracker {
    pending: Arc<PendingTable>,
    timeout: Duration,
    generation: AtomicU64,
}

impl CommandAckTracker {
    pub fn new(timeout: Duration) -> Self {
        Self { pending: Arc::new(DashMap::new()), timeout, generation: AtomicU64::new(0) }
    }

    pub fn register(&self, key: CommandKey) -> PendingAck {
        self.register_at(key, Instant::now())
    }

    /// Start tracking `key` as sent at `sent_at`.
    pub fn register_at(&self, key: CommandKey, sent_at: Instant) -> PendingAck {
        let (tx, rx) = oneshot::channel();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        if self.pending.insert(key, Pending { generation, sent_at, reply: tx }).is_some() {
            debug!(command = key.command, "Replacing outstanding command with the same key");
        }
        PendingAck { key, generation, rx, table: self.pending.clone() }
    }

    /// Resolve the matching pending command. Returns `false` for unsolicited acks.
    pub fn on_ack(&self, key: CommandKey, raw_result: u8) -> bool {
        match self.pending.remove(&key) {
            Some((_, pending)) => {
                let result = CommandAckResult::from_mav_result(raw_result);
                debug!(command = key.command, ?result, "Command acknowledged");
                let _ = pending.reply.send(result);
                true
            }
            None => {
                debug!(command = key.command, raw_result, "Ack for unknown command");
                false
            }
        }
    }

    /// Resolve every command older than the timeout as [`CommandAckResult::Timeout`].
    pub fn tick(&self, now: Instant) -> usize {
        let expired: Vec<CommandKey> = self
            .pending
            .iter()
            .filter(|entry| now.saturating_duration_since(entry.sent_at) > self.timeout)
            .map(|entry| *entry.key())
            .collect();

        let mut count = 0;
        for key in expired {
            if let Some((_, pending)) = self
                .pending
                .remove_if(&key, |_, p| now.saturating_duration_since(p.sent_at) > self.timeout)
            {
                warn!(command = key.command, timeout = ?self.timeout, "Command ack timed out");
                let _ = pending.reply.send(CommandAckResult::Timeout);
                count += 1;
            }
        }
        count
    }

    /// Drop every outstanding command; waiters resolve as cancelled.
    pub fn cancel_all(&self) {
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Resolves with the ack outcome for one registered command.
///
/// Dropping it before resolution frees the tracker slot.
#[derive(Debug)]
pub struct PendingAck {
    key: CommandKey,
    generation: u64,
    rx: oneshot::Receiver<CommandAckResult>,
    table: Arc<PendingTable>,
}

impl PendingAck {
    pub fn key(&self) -> CommandKey {
        self.key
    }
}

impl Future for PendingAck {
    type Output = Result<CommandAckResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let command = self.key.command;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|_| LinkError::cancelled(format!("command {command}"))))
    }
}

impl Drop for PendingAck {
    fn drop(&mut self) {
        let generation = self.generation;
        self.table.remove_if(&self.key, |_, p| p.generation == generation);
    }
}
