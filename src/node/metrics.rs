//! Dispatch counters.
//!
//! Plain atomics, readable at any time without stopping the pipelines.
//! Pending gauges track queue depth; the rest are monotonic totals.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one node's pipelines.
#[derive(Debug, Default)]
pub struct NodeMetrics {
    pub(crate) messages_processed: AtomicU64,
    pub(crate) requests_dropped: AtomicU64,
    pub(crate) responses_dropped: AtomicU64,
    pub(crate) notifications_sent: AtomicU64,
    pub(crate) notifications_dropped: AtomicU64,
    pub(crate) pending_incoming: AtomicU64,
    pub(crate) pending_outgoing: AtomicU64,
    pub(crate) pending_notifications: AtomicU64,
}

impl NodeMetrics {
    /// Responses delivered to their connection.
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    /// Requests abandoned after exhausting their retry budget.
    pub fn requests_dropped(&self) -> u64 {
        self.requests_dropped.load(Ordering::Relaxed)
    }

    /// Responses abandoned after exhausting their send budget.
    pub fn responses_dropped(&self) -> u64 {
        self.responses_dropped.load(Ordering::Relaxed)
    }

    /// Notification frames written successfully.
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    /// Notification frames that failed to write.
    pub fn notifications_dropped(&self) -> u64 {
        self.notifications_dropped.load(Ordering::Relaxed)
    }

    /// Requests queued but not yet dispatched.
    pub fn pending_incoming(&self) -> u64 {
        self.pending_incoming.load(Ordering::Relaxed)
    }

    /// Responses queued but not yet written.
    pub fn pending_outgoing(&self) -> u64 {
        self.pending_outgoing.load(Ordering::Relaxed)
    }

    /// Notifications queued but not yet fanned out.
    pub fn pending_notifications(&self) -> u64 {
        self.pending_notifications.load(Ordering::Relaxed)
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn drop_one(counter: &AtomicU64) {
        counter.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = NodeMetrics::default();
        assert_eq!(metrics.messages_processed(), 0);
        assert_eq!(metrics.requests_dropped(), 0);
        assert_eq!(metrics.pending_incoming(), 0);
    }

    #[test]
    fn gauges_move_both_ways() {
        let metrics = NodeMetrics::default();
        NodeMetrics::bump(&metrics.pending_incoming);
        NodeMetrics::bump(&metrics.pending_incoming);
        NodeMetrics::drop_one(&metrics.pending_incoming);
        assert_eq!(metrics.pending_incoming(), 1);
    }
}
