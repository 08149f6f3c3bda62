//! Out-of-band pushes from server to client.
//!
//! Notifications are bodiless frames with a zero id, addressed either to a
//! specific connection or to every connection authenticated as a given
//! identity. Handlers queue them through
//! [`HandlerContext`](crate::handler::HandlerContext); the node fans them
//! out after the originating message commits.

use std::sync::Arc;

use crate::connection::Connection;
use crate::protocol::frame::Frame;

/// Where a notification goes.
#[derive(Clone)]
pub enum NotificationTarget {
    /// One specific connection.
    Connection(Arc<Connection>),
    /// Every open connection authenticated as this identity.
    AuthenticatedId(u64),
}

/// A queued push.
#[derive(Clone)]
pub struct Notification {
    pub target: NotificationTarget,
    pub notification_type: u16,
    /// Object the notification is about, or zero.
    pub object_id: u64,
}

impl Notification {
    pub fn new(target: NotificationTarget, notification_type: u16, object_id: u64) -> Self {
        Self {
            target,
            notification_type,
            object_id,
        }
    }

    /// The frame every targeted connection receives.
    pub(crate) fn to_frame(&self) -> Frame {
        Frame::notification(self.notification_type, self.object_id)
    }
}
