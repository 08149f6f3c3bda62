//! Handler registration.
//!
//! A registry binds request types to handler instances for one node. Specs
//! carry a server id so a shared handler catalog can be registered against
//! several nodes, each keeping only the entries addressed to it.

use std::collections::HashMap;

use crate::error::{NodeError, Result};

use super::{ErasedHandler, Handler};

/// Where and how a handler binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerSpec {
    /// Node this handler belongs to; registration against another node's
    /// registry is silently skipped.
    pub server_id: u16,
    /// Request type the handler answers.
    pub request_type: u16,
    /// Minimum authenticated level; zero admits anonymous connections.
    pub required_level: u64,
}

impl HandlerSpec {
    pub const fn new(server_id: u16, request_type: u16) -> Self {
        Self {
            server_id,
            request_type,
            required_level: 0,
        }
    }

    /// Requires an authenticated level of at least `level`.
    pub const fn with_level(self, level: u64) -> Self {
        Self {
            required_level: level,
            ..self
        }
    }
}

pub(crate) struct Registered {
    pub(crate) handler: Box<dyn ErasedHandler>,
    pub(crate) required_level: u64,
}

/// The handlers one node dispatches to.
pub struct HandlerRegistry {
    server_id: u16,
    handlers: HashMap<u16, Registered>,
}

impl HandlerRegistry {
    pub fn new(server_id: u16) -> Self {
        Self {
            server_id,
            handlers: HashMap::new(),
        }
    }

    /// The node id this registry serves.
    #[inline]
    pub fn server_id(&self) -> u16 {
        self.server_id
    }

    /// Binds `H` to the spec's request type.
    ///
    /// A spec for a different server id is skipped without error. Binding
    /// the same request type twice is a configuration bug and fails.
    pub fn register<H: Handler>(&mut self, spec: HandlerSpec) -> Result<()> {
        if spec.server_id != self.server_id {
            return Ok(());
        }
        if self.handlers.contains_key(&spec.request_type) {
            return Err(NodeError::DuplicateHandler(spec.request_type));
        }
        self.handlers.insert(
            spec.request_type,
            Registered {
                handler: Box::new(H::default()),
                required_level: spec.required_level,
            },
        );
        Ok(())
    }

    /// Whether a request type is bound.
    pub fn contains(&self, request_type: u16) -> bool {
        self.handlers.contains_key(&request_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn get_mut(&mut self, request_type: u16) -> Option<&mut Registered> {
        self.handlers.get_mut(&request_type)
    }

    pub(crate) fn required_level(&self, request_type: u16) -> Option<u64> {
        self.handlers.get(&request_type).map(|r| r.required_level)
    }
}
