//! In-flight message records.
//!
//! Requests and responses carry their originating connection so the
//! pipeline workers can route without a lookup table. Both track how many
//! times they have been attempted; the ceilings live in
//! [`NodeConfig`](crate::config::NodeConfig).

use std::sync::Arc;

use bytes::Bytes;

use crate::connection::Connection;
use crate::protocol::frame::Frame;
use crate::protocol::wire::Header;

/// A decoded request waiting for, or being retried through, dispatch.
pub(crate) struct RequestMessage {
    pub connection: Arc<Connection>,
    /// Client-chosen correlation id; echoed on the response.
    pub id: u32,
    pub request_type: u16,
    pub body: Bytes,
    /// Completed dispatch attempts so far.
    pub process_attempts: u32,
}

impl RequestMessage {
    pub(crate) fn new(connection: Arc<Connection>, header: Header, body: Bytes) -> Self {
        let request_type = header.request_type().unwrap_or(0);
        Self {
            connection,
            id: header.id,
            request_type,
            body,
            process_attempts: 0,
        }
    }
}

/// An encoded frame waiting to be written to its connection.
pub(crate) struct ResponseMessage {
    pub connection: Arc<Connection>,
    pub frame: Frame,
    /// Completed write attempts so far.
    pub send_attempts: u32,
}

impl ResponseMessage {
    pub(crate) fn new(connection: Arc<Connection>, frame: Frame) -> Self {
        Self {
            connection,
            frame,
            send_attempts: 0,
        }
    }
}
