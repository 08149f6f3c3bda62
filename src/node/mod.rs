//! The node: sources, pipelines, and lifecycle.
//!
//! A running node is three worker tasks wired by queues, plus one read
//! loop per connection and an optional updater:
//!
//! ```text
//!   read loops ──> incoming ──> [incoming worker] ──> outgoing ──> [outgoing worker] ──> connections
//!                                 │        ▲                                                ▲
//!                     notifications        │ requeue on retryable save conflict             │
//!                                 ▼                                                         │
//!                           [notification worker] ── fan-out by identity ────────────────────┘
//! ```
//!
//! The incoming worker is the only task that touches handlers and the
//! message context, so request execution is serial by construction. The
//! updater shares that exclusivity through the context lock and a gate
//! the incoming worker checks before each dispatch.

mod metrics;

pub use metrics::NodeMetrics;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::NodeConfig;
use crate::connection::{Connection, ConnectionReader};
use crate::context::MessageContext;
use crate::error::{NodeError, Result};
use crate::handler::registry::HandlerRegistry;
use crate::handler::{HandlerContext, Session};
use crate::message::{RequestMessage, ResponseMessage};
use crate::notification::{Notification, NotificationTarget};
use crate::protocol::frame::Frame;
use crate::protocol::wire::{notification_code, response_code};
use crate::source::{self, Accept, Source};
use crate::updater::Tick;

type ConnectionSet = Arc<StdMutex<Vec<Arc<Connection>>>>;
type SharedContext = Arc<Mutex<Box<dyn MessageContext>>>;

/// A message-processing server over one or more connection sources.
pub struct Node {
    config: NodeConfig,
    registry: Option<HandlerRegistry>,
    context: SharedContext,
    sources: Vec<Source>,
    metrics: Arc<NodeMetrics>,
    updater: Option<(Duration, Box<dyn Tick>)>,
    next_connection_id: Arc<AtomicU64>,
    running: Option<Running>,
}

struct Running {
    cancel: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    updater_cancel: Option<watch::Sender<bool>>,
    updater_handle: Option<JoinHandle<()>>,
    connection_sets: Vec<ConnectionSet>,
}

impl Node {
    /// Creates a stopped node dispatching to `registry`.
    pub fn new(config: NodeConfig, registry: HandlerRegistry) -> Self {
        Self {
            config,
            registry: Some(registry),
            context: Arc::new(Mutex::new(Box::new(crate::context::NullContext))),
            sources: Vec::new(),
            metrics: Arc::new(NodeMetrics::default()),
            updater: None,
            next_connection_id: Arc::new(AtomicU64::new(0)),
            running: None,
        }
    }

    /// Installs the shared message context. Call before [`start`](Self::start).
    pub fn set_context(&mut self, context: Box<dyn MessageContext>) {
        self.context = Arc::new(Mutex::new(context));
    }

    /// Installs a periodic updater. Call before [`start`](Self::start).
    pub fn set_updater(&mut self, interval: Duration, tick: impl Tick) {
        self.updater = Some((interval, Box::new(tick)));
    }

    /// Adds a connection source. Call before [`start`](Self::start).
    pub fn add_source(&mut self, source: Source) {
        self.sources.push(source);
    }

    /// Dispatch counters.
    #[inline]
    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    /// Open connections across every source.
    pub fn connection_count(&self) -> usize {
        self.sources.iter().map(Source::connection_count).sum()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawns the pipelines and starts accepting clients.
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(NodeError::AlreadyRunning);
        }
        if self.sources.is_empty() {
            return Err(NodeError::NoSources);
        }
        if let Some(registry) = &self.registry {
            if registry.is_empty() {
                return Err(NodeError::NoHandlers(registry.server_id()));
            }
        }
        // Registries move into the incoming worker, so a node starts once.
        let registry = self.registry.take().ok_or(NodeError::AlreadyRunning)?;

        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (gate_tx, gate_rx) = watch::channel(false);

        let connection_sets: Vec<ConnectionSet> =
            self.sources.iter().map(Source::connections).collect();

        let mut handles = Vec::new();
        for (set, src) in connection_sets.iter().zip(self.sources.iter_mut()) {
            let acceptor = src.take_acceptor().ok_or(NodeError::AlreadyRunning)?;
            handles.push(tokio::spawn(accept_loop(AcceptLoop {
                acceptor,
                set: Arc::clone(set),
                incoming_tx: incoming_tx.clone(),
                cancel: cancel_rx.clone(),
                metrics: Arc::clone(&self.metrics),
                next_id: Arc::clone(&self.next_connection_id),
                block_size: self.config.block_size,
                max_body_length: self.config.max_body_length,
            })));
        }

        handles.push(tokio::spawn(
            IncomingWorker {
                registry,
                incoming_rx,
                incoming_tx: incoming_tx.clone(),
                outgoing_tx: outgoing_tx.clone(),
                notification_tx,
                context: Arc::clone(&self.context),
                gate: gate_rx,
                cancel: cancel_rx.clone(),
                retry_attempts: self.config.retry_attempts,
                max_body_length: self.config.max_body_length,
                metrics: Arc::clone(&self.metrics),
            }
            .run(),
        ));
        handles.push(tokio::spawn(
            OutgoingWorker {
                outgoing_rx,
                outgoing_tx,
                cancel: cancel_rx.clone(),
                retry_attempts: self.config.retry_attempts,
                metrics: Arc::clone(&self.metrics),
            }
            .run(),
        ));
        handles.push(tokio::spawn(
            NotificationWorker {
                notification_rx,
                cancel: cancel_rx,
                connection_sets: connection_sets.clone(),
                metrics: Arc::clone(&self.metrics),
            }
            .run(),
        ));

        let (updater_cancel, updater_handle) = match self.updater.take() {
            Some((interval, tick)) => {
                let (tx, rx) = watch::channel(false);
                let gate = UpdateGate {
                    gate: gate_tx,
                    connection_sets: connection_sets.clone(),
                    metrics: Arc::clone(&self.metrics),
                };
                let handle = tokio::spawn(updater_loop(
                    tick,
                    interval,
                    Arc::clone(&self.context),
                    gate,
                    rx,
                ));
                (Some(tx), Some(handle))
            }
            // No updater: dropping the gate sender leaves the gate
            // permanently open.
            None => (None, None),
        };

        self.running = Some(Running {
            cancel: cancel_tx,
            handles,
            updater_cancel,
            updater_handle,
            connection_sets,
        });
        info!(sources = self.sources.len(), "node started");
        Ok(())
    }

    /// Stops the node: halts the updater, tells clients, waits out the
    /// grace period, then tears the pipelines and connections down.
    pub async fn shutdown(&mut self) -> Result<()> {
        let running = self.running.take().ok_or(NodeError::NotRunning)?;

        if let Some(cancel) = running.updater_cancel {
            let _ = cancel.send(true);
        }
        if let Some(handle) = running.updater_handle {
            let _ = handle.await;
        }

        broadcast(
            &running.connection_sets,
            &self.metrics,
            notification_code::SERVER_SHUTTING_DOWN,
        )
        .await;
        tokio::time::sleep(self.config.shutdown_grace()).await;

        let _ = running.cancel.send(true);
        for handle in running.handles {
            let _ = handle.await;
        }

        for set in &running.connection_sets {
            for connection in source::snapshot(set) {
                connection.close();
            }
        }
        info!("node stopped");
        Ok(())
    }
}

/// Resolves when cancellation is signalled. A dropped sender counts.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Sends a bodiless notification frame to every connection on every set.
async fn broadcast(sets: &[ConnectionSet], metrics: &NodeMetrics, notification_type: u16) {
    let frame = Frame::notification(notification_type, 0);
    for set in sets {
        for connection in source::snapshot(set) {
            if connection.send(&frame).await {
                NodeMetrics::bump(&metrics.notifications_sent);
            } else {
                NodeMetrics::bump(&metrics.notifications_dropped);
            }
        }
    }
}

struct AcceptLoop {
    acceptor: Box<dyn Accept>,
    set: ConnectionSet,
    incoming_tx: mpsc::UnboundedSender<RequestMessage>,
    cancel: watch::Receiver<bool>,
    metrics: Arc<NodeMetrics>,
    next_id: Arc<AtomicU64>,
    block_size: usize,
    max_body_length: u16,
}

async fn accept_loop(mut state: AcceptLoop) {
    let mut readers = Vec::new();
    loop {
        tokio::select! {
            _ = cancelled(&mut state.cancel) => break,
            accepted = state.acceptor.accept() => {
                let Some((read_half, write_half)) = accepted else { break };
                let id = state.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                let connection = Arc::new(Connection::new(id, write_half, state.block_size));
                source::insert(&state.set, Arc::clone(&connection));
                debug!(connection = id, "connection accepted");

                let reader = ConnectionReader::new(connection, read_half, state.max_body_length);
                readers.push(tokio::spawn(read_loop(
                    reader,
                    Arc::clone(&state.set),
                    state.incoming_tx.clone(),
                    Arc::clone(&state.metrics),
                    state.cancel.clone(),
                )));
                readers.retain(|handle| !handle.is_finished());
            }
        }
    }
    for handle in readers {
        let _ = handle.await;
    }
}

async fn read_loop(
    mut reader: ConnectionReader,
    set: ConnectionSet,
    incoming_tx: mpsc::UnboundedSender<RequestMessage>,
    metrics: Arc<NodeMetrics>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = cancelled(&mut cancel) => break,
            received = reader.receive() => {
                let Some(request) = received else { break };
                if incoming_tx.send(request).is_err() {
                    break;
                }
                NodeMetrics::bump(&metrics.pending_incoming);
            }
        }
    }
    let connection = Arc::clone(reader.connection());
    source::remove(&set, &connection);
    connection.close();
}

enum Dispatched {
    Reply {
        code: u16,
        body: Bytes,
        notifications: Vec<Notification>,
        session: Option<Session>,
        dropped: bool,
    },
    Retry,
}

impl Dispatched {
    fn failure(code: u16) -> Self {
        Self::Reply {
            code,
            body: Bytes::new(),
            notifications: Vec::new(),
            session: None,
            dropped: false,
        }
    }
}

struct IncomingWorker {
    registry: HandlerRegistry,
    incoming_rx: mpsc::UnboundedReceiver<RequestMessage>,
    incoming_tx: mpsc::UnboundedSender<RequestMessage>,
    outgoing_tx: mpsc::UnboundedSender<ResponseMessage>,
    notification_tx: mpsc::UnboundedSender<Notification>,
    context: SharedContext,
    gate: watch::Receiver<bool>,
    cancel: watch::Receiver<bool>,
    retry_attempts: u32,
    max_body_length: u16,
    metrics: Arc<NodeMetrics>,
}

impl IncomingWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = cancelled(&mut self.cancel) => break,
                next = self.incoming_rx.recv() => {
                    let Some(request) = next else { break };
                    NodeMetrics::drop_one(&self.metrics.pending_incoming);
                    // An in-flight update owns the context; wait it out. A
                    // dropped sender means no updater is installed.
                    let _ = self.gate.wait_for(|updating| !*updating).await;
                    self.dispatch(request).await;
                }
            }
        }
    }

    async fn dispatch(&mut self, mut request: RequestMessage) {
        request.process_attempts += 1;
        let retry_attempts = self.retry_attempts;
        let max_body_length = self.max_body_length as usize;

        let Some(required_level) = self.registry.required_level(request.request_type) else {
            trace!(request_type = request.request_type, "unknown request type");
            self.respond(&request, response_code::WRONG_REQUEST_ID, Bytes::new());
            return;
        };
        if required_level > 0
            && (request.connection.authenticated_id() == 0
                || request.connection.authenticated_level() < required_level)
        {
            self.respond(&request, response_code::NOT_AUTHORIZED, Bytes::new());
            return;
        }

        let dispatched = {
            let mut guard = self.context.lock().await;
            let ctx = guard.as_mut();
            let Some(registered) = self.registry.get_mut(request.request_type) else {
                return;
            };
            let handler = registered.handler.as_mut();

            ctx.begin_message();
            handler.reset();

            let mut body = request.body.clone();
            let dispatched = if handler.deserialize(&mut body).is_err() {
                Dispatched::failure(response_code::WRONG_PARAMETER_NUMBER)
            } else {
                let code = handler.validate(&mut *ctx);
                if code != response_code::SUCCESS {
                    Dispatched::failure(code)
                } else {
                    let mut session = Session {
                        authenticated_id: request.connection.authenticated_id(),
                        authenticated_level: request.connection.authenticated_level(),
                    };
                    let mut notifications = Vec::new();
                    let code = {
                        let mut handler_ctx = HandlerContext::new(
                            &mut session,
                            &mut *ctx,
                            &request.connection,
                            &mut notifications,
                        );
                        handler.perform(&mut handler_ctx)
                    };
                    if code != response_code::SUCCESS {
                        Dispatched::failure(code)
                    } else {
                        match ctx.save_changes() {
                            Ok(()) => {
                                let mut out = BytesMut::new();
                                match handler.serialize(&mut out) {
                                    // A body the header cannot describe would
                                    // desynchronize the stream.
                                    Ok(()) if out.len() > max_body_length => {
                                        warn!(
                                            request_type = request.request_type,
                                            body_length = out.len(),
                                            "response body exceeds the frame limit"
                                        );
                                        Dispatched::failure(response_code::INTERNAL_SERVER_ERROR)
                                    }
                                    Ok(()) => Dispatched::Reply {
                                        code: response_code::SUCCESS,
                                        body: out.freeze(),
                                        notifications,
                                        session: Some(session),
                                        dropped: false,
                                    },
                                    Err(error) => {
                                        warn!(
                                            request_type = request.request_type,
                                            %error,
                                            "response serialization failed"
                                        );
                                        Dispatched::failure(response_code::INTERNAL_SERVER_ERROR)
                                    }
                                }
                            }
                            Err(save)
                                if save.retryable
                                    && request.process_attempts <= retry_attempts =>
                            {
                                Dispatched::Retry
                            }
                            Err(save) => {
                                let code = if save.retryable {
                                    response_code::TRY_AGAIN_LATER
                                } else {
                                    save.response_code
                                };
                                Dispatched::Reply {
                                    code,
                                    body: Bytes::new(),
                                    notifications: Vec::new(),
                                    session: None,
                                    dropped: true,
                                }
                            }
                        }
                    }
                }
            };
            ctx.end_message();
            dispatched
        };

        match dispatched {
            // The attempt stays invisible: no response, and anything the
            // handler queued is discarded with the uncommitted changes.
            Dispatched::Retry => {
                trace!(
                    request_type = request.request_type,
                    attempt = request.process_attempts,
                    "retryable save conflict, requeueing"
                );
                NodeMetrics::bump(&self.metrics.pending_incoming);
                let _ = self.incoming_tx.send(request);
            }
            Dispatched::Reply {
                code,
                body,
                notifications,
                session,
                dropped,
            } => {
                if dropped {
                    warn!(
                        request_type = request.request_type,
                        attempts = request.process_attempts,
                        code,
                        "request dropped"
                    );
                    NodeMetrics::bump(&self.metrics.requests_dropped);
                }
                if let Some(session) = session {
                    request
                        .connection
                        .set_authenticated(session.authenticated_id, session.authenticated_level);
                }
                for notification in notifications {
                    NodeMetrics::bump(&self.metrics.pending_notifications);
                    let _ = self.notification_tx.send(notification);
                }
                self.respond(&request, code, body);
            }
        }
    }

    fn respond(&self, request: &RequestMessage, code: u16, body: Bytes) {
        NodeMetrics::bump(&self.metrics.pending_outgoing);
        let _ = self.outgoing_tx.send(ResponseMessage::new(
            Arc::clone(&request.connection),
            Frame::response(request.id, code, body),
        ));
    }
}

struct OutgoingWorker {
    outgoing_rx: mpsc::UnboundedReceiver<ResponseMessage>,
    outgoing_tx: mpsc::UnboundedSender<ResponseMessage>,
    cancel: watch::Receiver<bool>,
    retry_attempts: u32,
    metrics: Arc<NodeMetrics>,
}

impl OutgoingWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = cancelled(&mut self.cancel) => break,
                next = self.outgoing_rx.recv() => {
                    let Some(mut response) = next else { break };
                    NodeMetrics::drop_one(&self.metrics.pending_outgoing);
                    if response.connection.send(&response.frame).await {
                        NodeMetrics::bump(&self.metrics.messages_processed);
                    } else {
                        response.send_attempts += 1;
                        if response.send_attempts <= self.retry_attempts {
                            NodeMetrics::bump(&self.metrics.pending_outgoing);
                            let _ = self.outgoing_tx.send(response);
                        } else {
                            warn!(
                                connection = response.connection.id(),
                                "response dropped after send retries"
                            );
                            NodeMetrics::bump(&self.metrics.responses_dropped);
                        }
                    }
                }
            }
        }
    }
}

struct NotificationWorker {
    notification_rx: mpsc::UnboundedReceiver<Notification>,
    cancel: watch::Receiver<bool>,
    connection_sets: Vec<ConnectionSet>,
    metrics: Arc<NodeMetrics>,
}

impl NotificationWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = cancelled(&mut self.cancel) => break,
                next = self.notification_rx.recv() => {
                    let Some(notification) = next else { break };
                    NodeMetrics::drop_one(&self.metrics.pending_notifications);
                    self.fan_out(notification).await;
                }
            }
        }
    }

    async fn fan_out(&self, notification: Notification) {
        let frame = notification.to_frame();
        // Resolve targets under the locks, send outside them.
        let targets: Vec<Arc<Connection>> = match &notification.target {
            NotificationTarget::Connection(connection) => vec![Arc::clone(connection)],
            NotificationTarget::AuthenticatedId(identity) => self
                .connection_sets
                .iter()
                .flat_map(|set| source::snapshot(set))
                .filter(|c| c.is_open() && c.authenticated_id() == *identity)
                .collect(),
        };

        for connection in targets {
            if connection.send(&frame).await {
                NodeMetrics::bump(&self.metrics.notifications_sent);
            } else {
                NodeMetrics::bump(&self.metrics.notifications_dropped);
            }
        }
    }
}

/// Pauses request dispatch around an update tick and tells the clients.
struct UpdateGate {
    gate: watch::Sender<bool>,
    connection_sets: Vec<ConnectionSet>,
    metrics: Arc<NodeMetrics>,
}

impl UpdateGate {
    async fn on_update_started(&self) {
        self.gate.send_replace(true);
        broadcast(
            &self.connection_sets,
            &self.metrics,
            notification_code::UPDATE_STARTED,
        )
        .await;
    }

    async fn on_update_finished(&self) {
        broadcast(
            &self.connection_sets,
            &self.metrics,
            notification_code::UPDATE_FINISHED,
        )
        .await;
        self.gate.send_replace(false);
    }
}

async fn updater_loop(
    mut tick: Box<dyn Tick>,
    interval: Duration,
    context: SharedContext,
    gate: UpdateGate,
    mut cancel: watch::Receiver<bool>,
) {
    let mut next = tokio::time::Instant::now();
    loop {
        next += interval;
        tokio::select! {
            _ = tokio::time::sleep_until(next) => {}
            _ = cancelled(&mut cancel) => break,
        }

        gate.on_update_started().await;
        {
            // The lock also waits out any dispatch already in flight.
            let mut guard = context.lock().await;
            let ctx = guard.as_mut();
            ctx.begin_message();
            tick.tick(&mut *ctx);
            if let Err(error) = ctx.save_changes() {
                warn!(%error, "update save failed");
            }
            ctx.end_message();
        }
        gate.on_update_finished().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, HandlerSpec};
    use crate::schema::{Field, Schema};

    #[derive(Default)]
    struct Noop;

    impl Schema for Noop {
        const INPUT: &'static [Field<Self>] = &[];
        const OUTPUT: &'static [Field<Self>] = &[];
    }

    impl Handler for Noop {
        fn perform(&mut self, _ctx: &mut HandlerContext<'_>) -> u16 {
            response_code::SUCCESS
        }
    }

    fn node() -> Node {
        let mut registry = HandlerRegistry::new(1);
        registry
            .register::<Noop>(HandlerSpec::new(1, 0x0101))
            .unwrap();
        let mut config = NodeConfig::default();
        config.shutdown_grace_ms = 0;
        Node::new(config, registry)
    }

    #[tokio::test]
    async fn start_without_sources_fails() {
        let mut node = node();
        assert!(matches!(node.start().await, Err(NodeError::NoSources)));
    }

    #[tokio::test]
    async fn start_without_handlers_fails() {
        let mut node = Node::new(NodeConfig::default(), HandlerRegistry::new(7));
        let (src, _connector) = crate::transport::local_pair();
        node.add_source(Source::new(src));
        assert!(matches!(node.start().await, Err(NodeError::NoHandlers(7))));
    }

    #[tokio::test]
    async fn shutdown_without_start_fails() {
        let mut node = node();
        assert!(matches!(node.shutdown().await, Err(NodeError::NotRunning)));
    }

    #[tokio::test]
    async fn undeliverable_response_counts_as_dropped() {
        let (near, far) = tokio::io::duplex(64);
        drop(far);
        let (_read_half, write_half) = tokio::io::split(near);
        let connection = Arc::new(Connection::new(1, Box::new(write_half), 64));

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let metrics = Arc::new(NodeMetrics::default());
        let worker = OutgoingWorker {
            outgoing_rx,
            outgoing_tx: outgoing_tx.clone(),
            cancel: cancel_rx,
            retry_attempts: 2,
            metrics: Arc::clone(&metrics),
        };
        let handle = tokio::spawn(worker.run());

        let frame = Frame::response(1, response_code::SUCCESS, Bytes::from_static(b"x"));
        NodeMetrics::bump(&metrics.pending_outgoing);
        outgoing_tx
            .send(ResponseMessage::new(Arc::clone(&connection), frame))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while metrics.responses_dropped() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(metrics.messages_processed(), 0);
        assert_eq!(metrics.pending_outgoing(), 0);

        let _ = cancel_tx.send(true);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn read_loop_gauge_skips_unqueued_requests() {
        use tokio::io::AsyncWriteExt;

        let (near, mut far) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(near);
        let connection = Arc::new(Connection::new(1, Box::new(write_half), 64));
        let set: ConnectionSet = Arc::new(StdMutex::new(vec![Arc::clone(&connection)]));
        let reader =
            ConnectionReader::new(Arc::clone(&connection), Box::new(read_half), u16::MAX);

        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        drop(incoming_rx);
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let metrics = Arc::new(NodeMetrics::default());

        let handle = tokio::spawn(read_loop(
            reader,
            Arc::clone(&set),
            incoming_tx,
            Arc::clone(&metrics),
            cancel_rx,
        ));

        let header = crate::protocol::wire::Header::request(1, 0x0101, 0);
        far.write_all(&header.encode()).await.unwrap();
        handle.await.unwrap();

        assert_eq!(metrics.pending_incoming(), 0);
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn double_start_fails() {
        let mut node = node();
        let (src, _connector) = crate::transport::local_pair();
        node.add_source(Source::new(src));
        node.start().await.unwrap();
        assert!(matches!(node.start().await, Err(NodeError::AlreadyRunning)));

        node.shutdown().await.unwrap();
        assert!(!node.is_running());
    }
}
