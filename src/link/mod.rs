//! Link supervision: who is on the other end and which commands await replies.

mod ack;
mod connection;

pub use ack::{CommandAckTracker, CommandKey, PendingAck};
pub use connection::ConnectionTracker;
