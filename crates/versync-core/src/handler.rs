//! Routing of inbound messages to handlers.
//!
//! A [`HandlerRegistry`] maps each [`MessageType`] to one handler. Handlers
//! receive exclusive access to the role's state `C` and take ownership of the
//! message; whatever they return is sent back to the peer.

use crate::{Message, MessageType};
use std::collections::HashMap;
use std::fmt;

/// A message handler over role state `C`.
pub type Handler<C> = Box<dyn Fn(&mut C, Message) -> Option<Message> + Send + Sync>;

/// What to do with a message whose type has no handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unhandled {
    /// Answer `NotSupported`, echoing the original payload (server).
    NotSupported,
    /// Drop the message without answering (client).
    Ignore,
}

/// Dispatch table from message type to handler.
pub struct HandlerRegistry<C> {
    handlers: HashMap<MessageType, Handler<C>>,
    unhandled: Unhandled,
}

impl<C> HandlerRegistry<C> {
    /// Create an empty registry.
    pub fn new(unhandled: Unhandled) -> Self {
        Self {
            handlers: HashMap::new(),
            unhandled,
        }
    }

    /// Build a registry from a declarative table. Later entries for the same
    /// type replace earlier ones.
    pub fn from_table<I>(unhandled: Unhandled, table: I) -> Self
    where
        I: IntoIterator<Item = (MessageType, Handler<C>)>,
    {
        let mut registry = Self::new(unhandled);
        for (ty, handler) in table {
            registry.register(ty, handler);
        }
        registry
    }

    /// Register `handler` for `ty`, returning the handler it replaced.
    pub fn register(&mut self, ty: MessageType, handler: Handler<C>) -> Option<Handler<C>> {
        self.handlers.insert(ty, handler)
    }

    pub fn handles(&self, ty: MessageType) -> bool {
        self.handlers.contains_key(&ty)
    }

    /// Route `message` to its handler and return the reply, if any.
    pub fn dispatch(&self, state: &mut C, message: Message) -> Option<Message> {
        match self.handlers.get(&message.ty) {
            Some(handler) => handler(state, message),
            None => match self.unhandled {
                Unhandled::NotSupported => Some(Message::not_supported(message.payload)),
                Unhandled::Ignore => None,
            },
        }
    }
}

impl<C> fmt::Debug for HandlerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().map(|ty| ty.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &types)
            .field("unhandled", &self.unhandled)
            .finish()
    }
}
