//! Built-in connection transports.

pub mod local;
pub mod tcp;

pub use local::{local_pair, LocalConnector, LocalSource};
pub use tcp::TcpSource;
