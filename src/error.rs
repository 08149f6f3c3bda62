//! Error types for reqwire.

use thiserror::Error;

/// Main error type for node setup and transport operations.
///
/// Per-message failures (validation, authorization, execution conflicts) are
/// not errors at this level; they travel back to the client as response
/// codes. `NodeError` covers the failures that have no response to carry
/// them: I/O, protocol violations, and misconfiguration.
#[derive(Debug, Error)]
pub enum NodeError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (malformed header, oversized body, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Two handlers registered for the same request-type id.
    #[error("request type {0} is registered more than once")]
    DuplicateHandler(u16),

    /// Startup was attempted with an empty handler registry.
    #[error("no handlers registered for server {0}")]
    NoHandlers(u16),

    /// Startup was attempted without any message source.
    #[error("no sources added")]
    NoSources,

    /// The node is already running.
    #[error("already started")]
    AlreadyRunning,

    /// The node is not running.
    #[error("not started")]
    NotRunning,

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using NodeError.
pub type Result<T> = std::result::Result<T, NodeError>;
