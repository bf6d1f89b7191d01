//! MAVLink 2 wire protocol: checksum, message layouts, framing and routing.
//!
//! Data flows `FrameReassembler::push` → [`codec::parse`] → [`Dispatcher::dispatch`].
//! Frames that fail validation are dropped between the first two steps and never
//! surface as errors.

pub mod codec;
pub mod crc;
pub mod dispatch;
pub mod frame_buffer;
pub mod message;

pub use codec::{Encoder, FrameRejection, ParsedMessage, parse, serialize};
pub use dispatch::{Dispatcher, FnHandler, MessageHandler, handler};
pub use frame_buffer::FrameReassembler;
pub use message::{FieldType, FieldValue, MessageSpec, Value, ids};
