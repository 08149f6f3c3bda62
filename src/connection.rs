//! A live client connection.
//!
//! Each accepted stream splits into a reader half, owned by that
//! connection's read loop, and a writer half shared behind the
//! [`Connection`] handle. All stream traffic moves in fixed-size blocks:
//! reads collect exactly the byte count a header promises, writes push the
//! encoded frame block by block until done. A connection whose stream
//! breaks is closed by its read loop and dropped rather than
//! resynchronized.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::message::RequestMessage;
use crate::protocol::frame::Frame;
use crate::protocol::wire::{Header, HEADER_SIZE};

/// Reader half of an accepted stream, erased to its transport.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Writer half of an accepted stream, erased to its transport.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Shared handle to one client connection.
///
/// Cheap to clone behind an [`Arc`]; the write side is serialized by an
/// internal lock so responses and notifications interleave whole frames.
pub struct Connection {
    id: u64,
    open: AtomicBool,
    authenticated_id: AtomicU64,
    authenticated_level: AtomicU64,
    writer: Mutex<BoxedWriter>,
    block_size: usize,
}

impl Connection {
    pub(crate) fn new(id: u64, writer: BoxedWriter, block_size: usize) -> Self {
        Self {
            id,
            open: AtomicBool::new(true),
            authenticated_id: AtomicU64::new(0),
            authenticated_level: AtomicU64::new(0),
            writer: Mutex::new(writer),
            block_size,
        }
    }

    /// Node-local connection id, for logging.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the connection is still usable.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Identity bound by a successful authentication, or zero.
    #[inline]
    pub fn authenticated_id(&self) -> u64 {
        self.authenticated_id.load(Ordering::Acquire)
    }

    /// Authorization level bound by a successful authentication.
    #[inline]
    pub fn authenticated_level(&self) -> u64 {
        self.authenticated_level.load(Ordering::Acquire)
    }

    /// Binds an authenticated identity and level to the connection.
    pub fn set_authenticated(&self, id: u64, level: u64) {
        self.authenticated_id.store(id, Ordering::Release);
        self.authenticated_level.store(level, Ordering::Release);
    }

    /// Marks the connection unusable. Idempotent.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!(connection = self.id, "connection closed");
        }
    }

    /// Writes one frame, block by block.
    ///
    /// Returns `false` when a live connection failed mid-write. The
    /// connection stays open so the caller may retry; teardown belongs to
    /// the read loop, which notices a dead peer on its own. Sending on an
    /// already-closed connection is a successful no-op, the frame is
    /// simply dropped.
    pub async fn send(&self, frame: &Frame) -> bool {
        if !self.is_open() {
            return true;
        }

        let encoded = frame.encode();
        let mut writer = self.writer.lock().await;
        for block in encoded.chunks(self.block_size) {
            if writer.write_all(block).await.is_err() {
                return false;
            }
        }
        if writer.flush().await.is_err() {
            return false;
        }

        trace!(
            connection = self.id,
            bytes = encoded.len(),
            "frame written"
        );
        true
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .field("authenticated_id", &self.authenticated_id())
            .finish()
    }
}

/// Reader half of a connection; owned by its read loop.
pub(crate) struct ConnectionReader {
    connection: Arc<Connection>,
    reader: BoxedReader,
    max_body_length: u16,
    block_size: usize,
}

impl ConnectionReader {
    pub(crate) fn new(
        connection: Arc<Connection>,
        reader: BoxedReader,
        max_body_length: u16,
    ) -> Self {
        let block_size = connection.block_size;
        Self {
            connection,
            reader,
            max_body_length,
            block_size,
        }
    }

    pub(crate) fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Reads the next request off the stream.
    ///
    /// Returns `None` when the peer disconnected or sent a malformed
    /// header; the connection is closed before returning so the write side
    /// drops anything still queued for it.
    pub(crate) async fn receive(&mut self) -> Option<RequestMessage> {
        let mut raw = [0u8; HEADER_SIZE];
        if self.read_blocks(&mut raw).await.is_err() {
            self.connection.close();
            return None;
        }

        let Some(header) = Header::decode_inbound(&raw) else {
            self.connection.close();
            return None;
        };
        if header.is_notification() {
            // Clients do not originate notifications.
            debug!(
                connection = self.connection.id,
                "notification frame from client, closing"
            );
            self.connection.close();
            return None;
        }
        if header.validate(self.max_body_length).is_err() {
            debug!(
                connection = self.connection.id,
                body_length = header.body_length,
                "oversized body, closing"
            );
            self.connection.close();
            return None;
        }

        let mut body = vec![0u8; header.body_length as usize];
        if self.read_blocks(&mut body).await.is_err() {
            self.connection.close();
            return None;
        }

        Some(RequestMessage::new(
            Arc::clone(&self.connection),
            header,
            Bytes::from(body),
        ))
    }

    async fn read_blocks(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        for block in buf.chunks_mut(self.block_size) {
            self.reader.read_exact(block).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::response_code;

    fn pair(block_size: usize, max_body: u16) -> (Arc<Connection>, ConnectionReader, tokio::io::DuplexStream) {
        let (near, far) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(near);
        let connection = Arc::new(Connection::new(1, Box::new(write_half), block_size));
        let reader = ConnectionReader::new(Arc::clone(&connection), Box::new(read_half), max_body);
        (connection, reader, far)
    }

    #[tokio::test]
    async fn send_writes_a_whole_frame() {
        let (connection, _reader, mut far) = pair(4, u16::MAX);
        let frame = Frame::response(7, response_code::SUCCESS, Bytes::from_static(b"hello"));
        assert!(connection.send(&frame).await);

        let mut raw = vec![0u8; HEADER_SIZE + 5];
        far.read_exact(&mut raw).await.unwrap();
        assert_eq!(raw, frame.encode());
    }

    #[tokio::test]
    async fn receive_roundtrips_a_request() {
        let (_connection, mut reader, mut far) = pair(4, u16::MAX);
        let header = Header::request(3, 0x0101, 2);
        far.write_all(&header.encode()).await.unwrap();
        far.write_all(&[0xAA, 0xBB]).await.unwrap();

        let request = reader.receive().await.unwrap();
        assert_eq!(request.id, 3);
        assert_eq!(request.request_type, 0x0101);
        assert_eq!(&request.body[..], &[0xAA, 0xBB]);
    }

    #[tokio::test]
    async fn peer_disconnect_closes_the_connection() {
        let (connection, mut reader, far) = pair(64, u16::MAX);
        drop(far);
        assert!(reader.receive().await.is_none());
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn oversized_body_tears_the_connection_down() {
        let (connection, mut reader, mut far) = pair(64, 8);
        let header = Header::request(1, 0x0101, 100);
        far.write_all(&header.encode()).await.unwrap();
        assert!(reader.receive().await.is_none());
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn client_notification_frame_tears_the_connection_down() {
        let (connection, mut reader, mut far) = pair(64, u16::MAX);
        let header = Header::notification(0, 9);
        far.write_all(&header.encode()).await.unwrap();
        assert!(reader.receive().await.is_none());
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn failed_send_leaves_the_connection_open() {
        let (connection, _reader, far) = pair(64, u16::MAX);
        drop(far);

        let frame = Frame::response(1, response_code::SUCCESS, Bytes::from_static(b"x"));
        assert!(!connection.send(&frame).await);
        // Retrying is the caller's call; only the read loop tears down.
        assert!(connection.is_open());
    }

    #[tokio::test]
    async fn send_on_closed_connection_is_a_noop() {
        let (connection, reader, mut far) = pair(64, u16::MAX);
        connection.close();
        let frame = Frame::response(1, response_code::SUCCESS, Bytes::new());
        assert!(connection.send(&frame).await);

        // Both handles hold the writer alive through the shared Arc.
        drop(reader);
        drop(connection);
        let mut raw = Vec::new();
        far.read_to_end(&mut raw).await.unwrap();
        assert!(raw.is_empty());
    }
}
