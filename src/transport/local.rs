//! In-process transport over duplex pipes.
//!
//! Useful for tests and for hosting a client in the same process as the
//! node without touching the network.

use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use crate::connection::{BoxedReader, BoxedWriter};
use crate::error::{NodeError, Result};
use crate::source::{Accept, BoxFuture};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Creates a connected source/connector pair.
pub fn local_pair() -> (LocalSource, LocalConnector) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LocalSource { incoming: rx }, LocalConnector { outgoing: tx })
}

/// Accepts in-process clients created by its paired [`LocalConnector`].
pub struct LocalSource {
    incoming: mpsc::UnboundedReceiver<(BoxedReader, BoxedWriter)>,
}

impl Accept for LocalSource {
    fn accept(&mut self) -> BoxFuture<'_, Option<(BoxedReader, BoxedWriter)>> {
        Box::pin(async { self.incoming.recv().await })
    }
}

/// Client-side handle; each `connect` yields a fresh stream to the node.
#[derive(Clone)]
pub struct LocalConnector {
    outgoing: mpsc::UnboundedSender<(BoxedReader, BoxedWriter)>,
}

impl LocalConnector {
    /// Opens a new in-process connection.
    ///
    /// Fails with [`NodeError::ConnectionClosed`] once the source side has
    /// been dropped.
    pub fn connect(&self) -> Result<DuplexStream> {
        let (near, far) = tokio::io::duplex(PIPE_CAPACITY);
        let (read_half, write_half) = tokio::io::split(far);
        self.outgoing
            .send((Box::new(read_half), Box::new(write_half)))
            .map_err(|_| NodeError::ConnectionClosed)?;
        Ok(near)
    }
}
