//! Binary-framed request/response server framework.
//!
//! `reqwire` hosts request handlers behind a compact binary protocol:
//! every frame is an 18-byte big-endian header plus a body whose shape is
//! declared, not hand-coded. Handlers are plain structs; their wire form,
//! validation, and response encoding all come from static field tables.
//!
//! # Architecture
//!
//! ```text
//!   TcpSource / LocalSource / your Accept impl
//!        │ accepted streams
//!        ▼
//!   +---------------------------- Node ----------------------------+
//!   |  read loops -> incoming queue -> incoming worker (handlers,  |
//!   |                                   validation, context save)  |
//!   |  outgoing worker <- outgoing queue <- responses              |
//!   |  notification worker <- pushes, fanned out by identity       |
//!   |  updater (optional): periodic tick with dispatch paused      |
//!   +---------------------------------------------------------------+
//! ```
//!
//! Request execution is serial per node: one incoming worker owns every
//! handler and the shared [`MessageContext`], so handlers never see
//! concurrent calls. Retryable save conflicts replay the whole request up
//! to a configured ceiling.
//!
//! # Example
//!
//! ```no_run
//! use reqwire::schema::{Field, FieldKind, Rule, Schema};
//! use reqwire::transport::TcpSource;
//! use reqwire::{
//!     response_code, Handler, HandlerContext, HandlerRegistry, HandlerSpec, Node, NodeConfig,
//!     Source,
//! };
//!
//! #[derive(Default)]
//! struct Echo {
//!     text: String,
//! }
//!
//! impl Schema for Echo {
//!     const INPUT: &'static [Field<Self>] = &[Field {
//!         name: "text",
//!         kind: FieldKind::Leaf(|m| &mut m.text),
//!         rules: &[Rule::string_length(1, 128)],
//!     }];
//!     // Echo sends the same field back.
//!     const OUTPUT: &'static [Field<Self>] = Self::INPUT;
//! }
//!
//! impl Handler for Echo {
//!     fn perform(&mut self, _ctx: &mut HandlerContext<'_>) -> u16 {
//!         response_code::SUCCESS
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> reqwire::Result<()> {
//!     let mut registry = HandlerRegistry::new(1);
//!     registry.register::<Echo>(HandlerSpec::new(1, 0x0101))?;
//!
//!     let mut node = Node::new(NodeConfig::default(), registry);
//!     node.add_source(Source::new(TcpSource::bind("127.0.0.1:9000").await?));
//!     node.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     node.shutdown().await
//! }
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod handler;
mod message;
pub mod node;
pub mod notification;
pub mod protocol;
pub mod schema;
pub mod source;
pub mod transport;
pub mod updater;

pub use config::NodeConfig;
pub use connection::Connection;
pub use context::{MessageContext, NullContext, SaveError};
pub use error::{NodeError, Result};
pub use handler::{Handler, HandlerContext, HandlerRegistry, HandlerSpec, Session};
pub use node::{Node, NodeMetrics};
pub use notification::{Notification, NotificationTarget};
pub use protocol::{notification_code, response_code, Frame, Header};
pub use schema::{
    Body, Direction, Field, FieldKind, FieldValue, PageQuery, Rule, Schema, SortKey, Timestamp,
};
pub use source::{Accept, Source};
pub use updater::Tick;
