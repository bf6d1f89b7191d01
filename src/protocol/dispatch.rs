//! Routes parsed messages to the one handler registered for their id.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use super::codec::ParsedMessage;
use crate::{LinkError, Result};

/// Consumer of one message type.
///
/// Handlers run on the ingest task and must not block; anything slow belongs on
/// another task.
pub trait MessageHandler: Send + Sync {
    fn message_id(&self) -> u32;
    fn handle(&self, message: &ParsedMessage);
}

/// Closure-backed handler, the usual way handlers are built.
pub struct FnHandler<F> {
    message_id: u32,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&ParsedMessage) + Send + Sync,
{
    pub fn new(message_id: u32, f: F) -> Self {
        Self { message_id, f }
    }
}

impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&ParsedMessage) + Send + Sync,
{
    fn message_id(&self) -> u32 {
        self.message_id
    }

    fn handle(&self, message: &ParsedMessage) {
        (self.f)(message)
    }
}

/// Box a closure as a handler for `message_id`.
pub fn handler<F>(message_id: u32, f: F) -> Box<dyn MessageHandler>
where
    F: Fn(&ParsedMessage) + Send + Sync + 'static,
{
    Box::new(FnHandler::new(message_id, f))
}

pub struct Dispatcher {
    handlers: HashMap<u32, Box<dyn MessageHandler>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().collect();
        ids.sort();
        f.debug_struct("Dispatcher").field("message_ids", &ids).finish()
    }
}

impl Dispatcher {
    /// Build the routing table. Two handlers for the same id is a configuration error.
    pub fn new(handlers: impl IntoIterator<Item = Box<dyn MessageHandler>>) -> Result<Self> {
        let mut table = HashMap::new();
        for handler in handlers {
            let message_id = handler.message_id();
            if table.insert(message_id, handler).is_some() {
                return Err(LinkError::DuplicateHandler { message_id });
            }
        }
        Ok(Self { handlers: table })
    }

    /// Hand `message` to its handler. Returns `false` when nothing is registered.
    pub fn dispatch(&self, message: &ParsedMessage) -> bool {
        match self.handlers.get(&message.message_id) {
            Some(handler) => {
                handler.handle(message);
                true
            }
            None => {
                trace!(message_id = message.message_id, "No handler registered");
                false
            }
        }
    }

    pub fn handles(&self, message_id: u32) -> bool {
        self.handlers.contains_key(&message_id)
    }
}
