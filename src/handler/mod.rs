//! Message handlers.
//!
//! A handler is a [`Schema`] payload with a [`perform`](Handler::perform)
//! method: the engine deserializes the request body into it, validates the
//! declared rules, calls `perform`, then serializes the same value's output
//! fields as the response body. One boxed instance per registered request
//! type lives for the node's lifetime and is reset before each use.

pub mod registry;

use bytes::{Buf, Bytes, BytesMut};

use crate::connection::Connection;
use crate::context::MessageContext;
use crate::notification::{Notification, NotificationTarget};
use crate::schema::{Body, Direction, Schema, SchemaError};

use std::sync::Arc;

pub use registry::{HandlerRegistry, HandlerSpec};

/// Per-connection authentication state, as seen by a handler.
///
/// Changes a handler makes here are bound to the connection only when the
/// message completes with a success response.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Authenticated identity, or zero when anonymous.
    pub authenticated_id: u64,
    /// Authorization level; gates handlers with a nonzero required level.
    pub authenticated_level: u64,
}

impl Session {
    /// Whether any identity is bound.
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated_id != 0
    }
}

/// Everything a handler may touch while performing one message.
pub struct HandlerContext<'a> {
    /// Authentication state; mutate to log the connection in or out.
    pub session: &'a mut Session,
    /// Shared application state.
    pub context: &'a mut dyn MessageContext,
    connection: &'a Arc<Connection>,
    notifications: &'a mut Vec<Notification>,
}

impl<'a> HandlerContext<'a> {
    pub(crate) fn new(
        session: &'a mut Session,
        context: &'a mut dyn MessageContext,
        connection: &'a Arc<Connection>,
        notifications: &'a mut Vec<Notification>,
    ) -> Self {
        Self {
            session,
            context,
            connection,
            notifications,
        }
    }

    /// The connection the request arrived on.
    #[inline]
    pub fn connection(&self) -> &Arc<Connection> {
        self.connection
    }

    /// Queues a push back to the requesting connection.
    ///
    /// Queued notifications go out only if the message commits; a retried
    /// or failed attempt discards them.
    pub fn notify_sender(&mut self, notification_type: u16, object_id: u64) {
        self.notifications.push(Notification::new(
            NotificationTarget::Connection(Arc::clone(self.connection)),
            notification_type,
            object_id,
        ));
    }

    /// Queues a push to every connection authenticated as `identity`.
    pub fn notify_identity(&mut self, identity: u64, notification_type: u16, object_id: u64) {
        self.notifications.push(Notification::new(
            NotificationTarget::AuthenticatedId(identity),
            notification_type,
            object_id,
        ));
    }
}

/// One request type's implementation.
pub trait Handler: Schema {
    /// Executes the request. Input fields hold the deserialized, validated
    /// parameters; output fields set here become the response body when the
    /// returned code is
    /// [`SUCCESS`](crate::protocol::wire::response_code::SUCCESS).
    fn perform(&mut self, ctx: &mut HandlerContext<'_>) -> u16;
}

/// Object-safe handler surface the dispatcher drives.
pub(crate) trait ErasedHandler: Send {
    /// Returns the value to its blank state before a new request.
    fn reset(&mut self);
    /// Fills input fields from a request body; the body must be consumed
    /// exactly.
    fn deserialize(&mut self, body: &mut Bytes) -> Result<(), SchemaError>;
    /// Appends the response body from output fields.
    fn serialize(&mut self, buf: &mut BytesMut) -> Result<(), SchemaError>;
    /// Runs input rules; returns the first failure's code.
    fn validate(&mut self, ctx: &mut dyn MessageContext) -> u16;
    fn perform(&mut self, ctx: &mut HandlerContext<'_>) -> u16;
}

impl<H: Handler> ErasedHandler for H {
    fn reset(&mut self) {
        *self = H::default();
    }

    fn deserialize(&mut self, body: &mut Bytes) -> Result<(), SchemaError> {
        Body::deserialize(self, Direction::Input, body)?;
        if body.has_remaining() {
            // Trailing bytes mean the client sent the wrong shape.
            return Err(SchemaError::WrongParameterCount);
        }
        Ok(())
    }

    fn serialize(&mut self, buf: &mut BytesMut) -> Result<(), SchemaError> {
        Body::serialize(self, Direction::Output, buf)
    }

    fn validate(&mut self, ctx: &mut dyn MessageContext) -> u16 {
        Body::validate(self, Direction::Input, ctx)
    }

    fn perform(&mut self, ctx: &mut HandlerContext<'_>) -> u16 {
        Handler::perform(self, ctx)
    }
}
