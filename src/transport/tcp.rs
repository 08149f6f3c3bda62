//! TCP listener transport.

use std::net::SocketAddr;

use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, warn};

use crate::connection::{BoxedReader, BoxedWriter};
use crate::error::Result;
use crate::source::{Accept, BoxFuture};

/// Accepts clients from a TCP listener.
pub struct TcpSource {
    listener: TcpListener,
}

impl TcpSource {
    /// Binds a listener on `addr`.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        debug!(addr = %listener.local_addr()?, "tcp source bound");
        Ok(Self { listener })
    }

    /// The bound address; useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

impl Accept for TcpSource {
    fn accept(&mut self) -> BoxFuture<'_, Option<(BoxedReader, BoxedWriter)>> {
        Box::pin(async {
            loop {
                match self.listener.accept().await {
                    Ok((stream, peer)) => {
                        debug!(%peer, "tcp client accepted");
                        if let Err(error) = stream.set_nodelay(true) {
                            warn!(%peer, %error, "set_nodelay failed");
                        }
                        let (read_half, write_half) = stream.into_split();
                        return Some((
                            Box::new(read_half) as BoxedReader,
                            Box::new(write_half) as BoxedWriter,
                        ));
                    }
                    // Transient accept errors (fd exhaustion, aborted
                    // handshakes) should not stop the listener.
                    Err(error) => warn!(%error, "tcp accept failed"),
                }
            }
        })
    }
}
