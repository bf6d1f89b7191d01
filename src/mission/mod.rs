//! Mission transfer protocol.
//!
//! Upload: clear-all, count, then one MISSION_ITEM_INT per vehicle request, finished
//! by the vehicle's MISSION_ACK. Download: request-list, the vehicle's count, then one
//! request per item, finished by our MISSION_ACK.

mod commands;
mod transfer;

pub use commands::MissionOutbound;
pub use transfer::{DownloadReply, MissionTransfer};
