//! Transactional context collaborator.
//!
//! The node does not know what "persisting" means; it only brackets every
//! request execution and update tick in `begin_message`/`end_message` and
//! reacts to the outcome of `save_changes`. Optimistic-concurrency stores
//! signal a retryable conflict to have the same request replayed; fatal
//! conflicts carry the response code the client should see.

use thiserror::Error;

use crate::protocol::response_code;

/// Failure signal from [`MessageContext::save_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("context save failed with code {response_code} (retryable: {retryable})")]
pub struct SaveError {
    /// Whether replaying the same request may succeed.
    pub retryable: bool,
    /// Response code to propagate when the failure is terminal.
    pub response_code: u16,
}

impl SaveError {
    /// A conflict that may succeed if the request is replayed.
    pub fn retryable() -> Self {
        Self {
            retryable: true,
            response_code: response_code::TRY_AGAIN_LATER,
        }
    }

    /// A terminal conflict carrying its own response code.
    pub fn fatal(response_code: u16) -> Self {
        Self {
            retryable: false,
            response_code,
        }
    }
}

/// Unit-of-work collaborator bracketing each request execution.
///
/// Requests are processed serially per node, so implementations may reuse
/// state between messages; ownership of an open transaction is scoped
/// strictly within one `begin_message`/`end_message` bracket.
pub trait MessageContext: Send {
    /// Called before the request body is deserialized.
    fn begin_message(&mut self) {}

    /// Called after execution, on every path including failures.
    fn end_message(&mut self) {}

    /// Persist changes made during execution.
    fn save_changes(&mut self) -> Result<(), SaveError> {
        Ok(())
    }
}

/// A context that persists nothing. Default for nodes without a store.
#[derive(Debug, Default)]
pub struct NullContext;

impl MessageContext for NullContext {}
