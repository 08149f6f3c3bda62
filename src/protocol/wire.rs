//! Wire format encoding and decoding.
//!
//! Implements the fixed 18-byte header:
//! ```text
//! ┌──────────┬────────────┬──────────┬──────────────────────────────┐
//! │ Version  │ BodyLength │ Id       │ Detail (10 bytes)            │
//! │ 2 bytes  │ 2 bytes    │ 4 bytes  │ request type | response code │
//! │ uint16 BE│ uint16 BE  │ uint32 BE│ | notif type + object id     │
//! └──────────┴────────────┴──────────┴──────────────────────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian. The header length is the same
//! for every message kind; detail fields that do not fill the 10-byte
//! region are zero padded. An id of 0 is reserved: it marks the frame as a
//! notification rather than a request/response transaction.

use crate::error::{NodeError, Result};

/// Header size in bytes (fixed, exactly 18).
pub const HEADER_SIZE: usize = 18;

/// Protocol version written into outbound headers.
pub const PROTOCOL_VERSION: u16 = 1;

/// Absolute maximum body length the protocol can express.
pub const MAX_BODY_LENGTH: u16 = u16::MAX;

/// Reserved message id marking a notification frame.
pub const NOTIFICATION_ID: u32 = 0;

/// Response codes shared by both ends of the protocol.
pub mod response_code {
    /// The request was executed and its output serialized.
    pub const SUCCESS: u16 = 0;
    /// The connection's privilege level is below the handler's requirement.
    pub const NOT_AUTHORIZED: u16 = 1;
    /// No handler is registered for the request-type id.
    pub const WRONG_REQUEST_ID: u16 = 2;
    /// The body ended before all declared input fields were read.
    pub const WRONG_PARAMETER_NUMBER: u16 = 3;
    /// The handler failed in a way it could not express itself.
    pub const INTERNAL_SERVER_ERROR: u16 = 4;
    /// A declared validation rule rejected an input field.
    pub const PARAMETER_VALIDATION_FAILED: u16 = 5;
    /// Credentials were presented and rejected.
    pub const AUTHENTICATION_FAILED: u16 = 6;
    /// The retry ceiling was reached on a retryable conflict.
    pub const TRY_AGAIN_LATER: u16 = 7;
    /// A non-retryable concurrency conflict.
    pub const CONCURRENCY_FAILURE: u16 = 8;
}

/// Notification types reserved by the node itself.
pub mod notification_code {
    /// A periodic update tick is about to run.
    pub const UPDATE_STARTED: u16 = 0;
    /// The update tick completed; request processing resumes.
    pub const UPDATE_FINISHED: u16 = 1;
    /// The server is shutting down.
    pub const SERVER_SHUTTING_DOWN: u16 = 2;
}

/// The message-kind specific portion of a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDetail {
    /// Inbound transaction: which handler processes the body.
    Request { request_type: u16 },
    /// Outbound transaction: how the request fared.
    Response { code: u16 },
    /// Out-of-band push; the id field is 0.
    Notification { notification_type: u16, object_id: u64 },
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol version.
    pub version: u16,
    /// Body length in bytes.
    pub body_length: u16,
    /// Message/transaction id (0 = notification).
    pub id: u32,
    /// Kind-specific fields.
    pub detail: HeaderDetail,
}

impl Header {
    /// Create a request header. The id must be non-zero.
    pub fn request(id: u32, request_type: u16, body_length: u16) -> Self {
        debug_assert_ne!(id, NOTIFICATION_ID);
        Self {
            version: PROTOCOL_VERSION,
            body_length,
            id,
            detail: HeaderDetail::Request { request_type },
        }
    }

    /// Create a response header carrying the same id as its request.
    pub fn response(id: u32, code: u16, body_length: u16) -> Self {
        debug_assert_ne!(id, NOTIFICATION_ID);
        Self {
            version: PROTOCOL_VERSION,
            body_length,
            id,
            detail: HeaderDetail::Response { code },
        }
    }

    /// Create a notification header (id 0, empty body).
    pub fn notification(notification_type: u16, object_id: u64) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            body_length: 0,
            id: NOTIFICATION_ID,
            detail: HeaderDetail::Notification {
                notification_type,
                object_id,
            },
        }
    }

    /// Encode the header to bytes (Big Endian, zero padded).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.version.to_be_bytes());
        buf[2..4].copy_from_slice(&self.body_length.to_be_bytes());
        buf[4..8].copy_from_slice(&self.id.to_be_bytes());

        match self.detail {
            HeaderDetail::Request { request_type } => {
                buf[8..10].copy_from_slice(&request_type.to_be_bytes());
            }
            HeaderDetail::Response { code } => {
                buf[8..10].copy_from_slice(&code.to_be_bytes());
            }
            HeaderDetail::Notification {
                notification_type,
                object_id,
            } => {
                buf[8..10].copy_from_slice(&notification_type.to_be_bytes());
                buf[10..18].copy_from_slice(&object_id.to_be_bytes());
            }
        }

        buf
    }

    /// Decode a header arriving at the server (request or notification).
    ///
    /// Returns `None` if the buffer is too short. An id of 0 yields a
    /// notification; any other id yields a request.
    pub fn decode_inbound(buf: &[u8]) -> Option<Self> {
        let (version, body_length, id) = Self::decode_common(buf)?;

        let detail = if id == NOTIFICATION_ID {
            HeaderDetail::Notification {
                notification_type: u16::from_be_bytes([buf[8], buf[9]]),
                object_id: u64::from_be_bytes(buf[10..18].try_into().ok()?),
            }
        } else {
            HeaderDetail::Request {
                request_type: u16::from_be_bytes([buf[8], buf[9]]),
            }
        };

        Some(Self {
            version,
            body_length,
            id,
            detail,
        })
    }

    /// Decode a header arriving at a client (response or notification).
    pub fn decode_outbound(buf: &[u8]) -> Option<Self> {
        let (version, body_length, id) = Self::decode_common(buf)?;

        let detail = if id == NOTIFICATION_ID {
            HeaderDetail::Notification {
                notification_type: u16::from_be_bytes([buf[8], buf[9]]),
                object_id: u64::from_be_bytes(buf[10..18].try_into().ok()?),
            }
        } else {
            HeaderDetail::Response {
                code: u16::from_be_bytes([buf[8], buf[9]]),
            }
        };

        Some(Self {
            version,
            body_length,
            id,
            detail,
        })
    }

    fn decode_common(buf: &[u8]) -> Option<(u16, u16, u32)> {
        if buf.len() < HEADER_SIZE {
            return None;
        }

        Some((
            u16::from_be_bytes([buf[0], buf[1]]),
            u16::from_be_bytes([buf[2], buf[3]]),
            u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        ))
    }

    /// Validate the header against a deployment body-length bound.
    ///
    /// A header claiming more than `max_body_length` is a protocol
    /// violation: the connection is torn down rather than allocating.
    pub fn validate(&self, max_body_length: u16) -> Result<()> {
        if self.body_length > max_body_length {
            return Err(NodeError::Protocol(format!(
                "body length {} exceeds maximum {}",
                self.body_length, max_body_length
            )));
        }

        Ok(())
    }

    /// Check if this header marks a notification frame.
    #[inline]
    pub fn is_notification(&self) -> bool {
        self.id == NOTIFICATION_ID
    }

    /// Request type, when this is a request header.
    #[inline]
    pub fn request_type(&self) -> Option<u16> {
        match self.detail {
            HeaderDetail::Request { request_type } => Some(request_type),
            _ => None,
        }
    }
}
