//! Protocol module - wire format and frame types.
//!
//! This module implements the binary protocol:
//! - 18-byte header encoding/decoding, response and notification codes
//! - Frame struct pairing a header with a `Bytes` body

pub mod frame;
pub mod wire;

pub use frame::Frame;
pub use wire::{
    notification_code, response_code, Header, HeaderDetail, HEADER_SIZE, MAX_BODY_LENGTH,
    NOTIFICATION_ID, PROTOCOL_VERSION,
};
