//! Frame struct with typed accessors.
//!
//! A frame is one complete header+body unit exchanged over a connection.
//! Bodies use `bytes::Bytes` for cheap sharing: a notification broadcast
//! clones one frame per live connection without copying the body.

use bytes::Bytes;

use super::wire::{Header, HeaderDetail, HEADER_SIZE};

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Body bytes (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame from header and body.
    pub fn new(header: Header, body: Bytes) -> Self {
        debug_assert_eq!(header.body_length as usize, body.len());
        Self { header, body }
    }

    /// Create a response frame for the given transaction id.
    pub fn response(id: u32, code: u16, body: Bytes) -> Self {
        Self::new(Header::response(id, code, body.len() as u16), body)
    }

    /// Create a notification frame (id 0, empty body).
    pub fn notification(notification_type: u16, object_id: u64) -> Self {
        Self::new(Header::notification(notification_type, object_id), Bytes::new())
    }

    /// Get the message/transaction id.
    #[inline]
    pub fn id(&self) -> u32 {
        self.header.id
    }

    /// Get the body length.
    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Get the request-type id, if this frame is a request.
    #[inline]
    pub fn request_type(&self) -> Option<u16> {
        match self.header.detail {
            HeaderDetail::Request { request_type } => Some(request_type),
            _ => None,
        }
    }

    /// Get the response code, if this frame is a response.
    #[inline]
    pub fn response_code(&self) -> Option<u16> {
        match self.header.detail {
            HeaderDetail::Response { code } => Some(code),
            _ => None,
        }
    }

    /// Check if this frame is a notification.
    #[inline]
    pub fn is_notification(&self) -> bool {
        self.header.is_notification()
    }

    /// Encode header and body into one contiguous buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.body.len());
        buf.extend_from_slice(&self.header.encode());
        buf.extend_from_slice(&self.body);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::{notification_code, response_code};

    #[test]
    fn response_frame_accessors() {
        let frame = Frame::response(42, response_code::SUCCESS, Bytes::from_static(b"hello"));

        assert_eq!(frame.id(), 42);
        assert_eq!(frame.body_len(), 5);
        assert_eq!(frame.response_code(), Some(response_code::SUCCESS));
        assert_eq!(frame.request_type(), None);
        assert!(!frame.is_notification());
    }

    #[test]
    fn notification_frame_has_zero_id_and_empty_body() {
        let frame = Frame::notification(notification_code::SERVER_SHUTTING_DOWN, 0);

        assert!(frame.is_notification());
        assert_eq!(frame.id(), 0);
        assert_eq!(frame.body_len(), 0);
    }

    #[test]
    fn encode_is_header_then_body() {
        let frame = Frame::response(7, 0, Bytes::from_static(b"abc"));
        let bytes = frame.encode();

        assert_eq!(bytes.len(), HEADER_SIZE + 3);
        assert_eq!(&bytes[..HEADER_SIZE], &frame.header.encode());
        assert_eq!(&bytes[HEADER_SIZE..], b"abc");
    }

    #[test]
    fn clone_shares_body_storage() {
        let frame = Frame::response(1, 0, Bytes::from_static(b"shared"));
        let clone = frame.clone();
        assert_eq!(clone.body.as_ptr(), frame.body.as_ptr());
    }
}
