//! WebSocket Bridge Server
//!
//! Async WebSocket endpoint for external controllers. Frames fan out as
//! binary messages; actions come in as JSON and their acknowledgments are
//! returned on the connection that submitted them.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::agent::metrics::frame_progress_due;
use crate::bridge::BridgeHandle;
use crate::capture::frame::EncodedFrame;
use crate::control::action::Acknowledgment;
use crate::control::applier::OWNER_NOT_READY;
use crate::control::world::WorldSnapshot;
use crate::network::protocol::{encode_frame_message, BridgeMessage};

/// Ack kind used when an inbound message could not be decoded.
pub const UNKNOWN_KIND: &str = "unknown";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent controllers.
    pub max_connections: usize,
    /// Per-connection outbound queue depth.
    pub outbound_queue: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], crate::DEFAULT_PORT)),
            max_connections: 16,
            outbound_queue: 64,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection limit reached.
    #[error("Connection limit reached ({0})")]
    ConnectionLimitReached(usize),
}

// =============================================================================
// CONNECTION SET
// =============================================================================

/// A connected controller.
struct Connection {
    addr: SocketAddr,
    outbound: mpsc::Sender<Message>,
    connected_at: Instant,
}

/// Fan-out handle over the live connection set.
///
/// Cheap to clone and safe to call from encoder and owner threads: sends
/// never block, and a full per-connection queue drops the message for that
/// connection only.
#[derive(Clone, Default)]
pub struct Broadcaster {
    connections: Arc<RwLock<BTreeMap<Uuid, Connection>>>,
    frames_sent: Arc<AtomicU64>,
}

impl Broadcaster {
    /// Empty connection set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Controllers currently connected.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Send a frame to every controller. Returns how many accepted it.
    pub fn broadcast_frame(&self, frame: &EncodedFrame) -> usize {
        let bytes = encode_frame_message(frame);
        let size = bytes.len();
        let delivered = self.broadcast(Message::Binary(bytes));

        let sent = self.frames_sent.fetch_add(1, Ordering::Relaxed) + 1;
        if frame_progress_due(sent) {
            info!(
                "Frame #{} seq={} ({} bytes) sent to {} controller(s)",
                sent, frame.sequence, size, delivered
            );
        }
        #[cfg(feature = "debug-tracing")]
        tracing::trace!(sequence = frame.sequence, bytes = size, delivered, "frame broadcast");

        delivered
    }

    /// Push a `state` message to every controller.
    pub fn broadcast_state(&self, snapshot: &WorldSnapshot) -> usize {
        match BridgeMessage::State(snapshot.clone()).to_json() {
            Ok(text) => self.broadcast(Message::Text(text)),
            Err(e) => {
                error!("Failed to serialize state: {}", e);
                0
            }
        }
    }

    /// Frames handed to [`Self::broadcast_frame`] so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    fn broadcast(&self, message: Message) -> usize {
        let connections = self.connections.read();
        let mut delivered = 0;
        for (id, conn) in connections.iter() {
            match conn.outbound.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!("Outbound queue full for {} ({}), message dropped", conn.addr, id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    fn register(&self, id: Uuid, connection: Connection) {
        self.connections.write().insert(id, connection);
    }

    fn unregister(&self, id: &Uuid) -> Option<Connection> {
        self.connections.write().remove(id)
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// The bridge's WebSocket endpoint.
pub struct BridgeServer {
    /// Server configuration.
    config: ServerConfig,
    /// Route into the owning thread.
    handle: BridgeHandle,
    /// Connected controllers.
    broadcaster: Broadcaster,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl BridgeServer {
    /// Create a server feeding `handle` and fanning out through `broadcaster`.
    pub fn new(config: ServerConfig, handle: BridgeHandle, broadcaster: Broadcaster) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            handle,
            broadcaster,
            shutdown_tx,
        }
    }

    /// Fan-out handle for frames and state.
    pub fn broadcaster(&self) -> Broadcaster {
        self.broadcaster.clone()
    }

    /// Controllers currently connected.
    pub fn connection_count(&self) -> usize {
        self.broadcaster.connection_count()
    }

    /// Bind the configured address and serve until [`Self::shutdown`].
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until [`Self::shutdown`].
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!(
            "Bridge server v{} listening on ws://{}",
            self.config.version,
            listener.local_addr()?
        );
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if let Err(e) = self.check_capacity() {
                                warn!("Rejecting {}: {}", addr, e);
                                continue;
                            }
                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Stop accepting and close every connection.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    fn check_capacity(&self) -> Result<(), ServerError> {
        if self.broadcaster.connection_count() >= self.config.max_connections {
            return Err(ServerError::ConnectionLimitReached(self.config.max_connections));
        }
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let handle = self.handle.clone();
        let broadcaster = self.broadcaster.clone();
        let queue_depth = self.config.outbound_queue.max(1);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<Message>(queue_depth);

            let id = Uuid::new_v4();
            broadcaster.register(id, Connection {
                addr,
                outbound: msg_tx.clone(),
                connected_at: Instant::now(),
            });

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    if ws_sender.send(msg).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                Self::handle_text(addr, &text, &handle, &msg_tx).await;
                            }
                            Some(Ok(Message::Binary(data))) => {
                                debug!("Binary message ({} bytes) from {} rejected", data.len(), addr);
                                let ack = Acknowledgment::failed_kind(
                                    UNKNOWN_KIND,
                                    "binary messages are not accepted",
                                );
                                send_message(&msg_tx, &BridgeMessage::Ack(ack)).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            // Cleanup
            if let Some(conn) = broadcaster.unregister(&id) {
                info!(
                    "Controller {} disconnected after {:.1}s",
                    conn.addr,
                    conn.connected_at.elapsed().as_secs_f64()
                );
            }
            drop(msg_tx);
            // Give the writer a moment to flush a pending close frame.
            let _ = tokio::time::timeout(std::time::Duration::from_millis(100), sender_task).await;
        });
    }

    /// Decode one text message and route it.
    async fn handle_text(
        addr: SocketAddr,
        text: &str,
        handle: &BridgeHandle,
        sender: &mpsc::Sender<Message>,
    ) {
        let message = match BridgeMessage::from_json(text) {
            Ok(m) => m,
            Err(e) => {
                debug!("Invalid message from {}: {}", addr, e);
                let ack = Acknowledgment::failed_kind(UNKNOWN_KIND, e.to_string());
                send_message(sender, &BridgeMessage::Ack(ack)).await;
                return;
            }
        };

        match message {
            BridgeMessage::Action(command) => {
                debug!("Action from {}: {}", addr, command.summary());
                let ack_rx = handle.submit_action(command);
                let metrics = handle.metrics();
                let sender = sender.clone();
                tokio::spawn(async move {
                    let ack = ack_rx
                        .await
                        .unwrap_or_else(|_| Acknowledgment::failed(OWNER_NOT_READY));
                    metrics.record_ack(&ack);
                    if !ack.success {
                        warn!(
                            "Action from {} failed: {}",
                            addr,
                            ack.error.as_deref().unwrap_or("unknown")
                        );
                    }
                    send_message(&sender, &BridgeMessage::Ack(ack)).await;
                });
            }
            BridgeMessage::FrameConfig(config) => {
                info!(
                    "Frame config from {}: enabled={} {}x{} every {} frames, quality {:.2}",
                    addr, config.enabled, config.width, config.height,
                    config.capture_every, config.quality
                );
                if !handle.configure_frames(config) {
                    warn!("Owner gone, frame config from {} discarded", addr);
                }
            }
            other @ (BridgeMessage::Ack(_) | BridgeMessage::State(_)) => {
                debug!("Ignoring inbound {} from {}", other.kind(), addr);
            }
        }
    }
}

/// Serialize and queue a JSON message on one connection.
async fn send_message(sender: &mpsc::Sender<Message>, message: &BridgeMessage) {
    match message.to_json() {
        Ok(text) => {
            let _ = sender.send(Message::Text(text)).await;
        }
        Err(e) => error!("Failed to serialize {}: {}", message.kind(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_tungstenite::connect_async;

    use crate::bridge::OwnerCommand;
    use crate::capture::frame::FrameConfig;
    use crate::network::protocol::{decode_frame_message, FrameHeader};

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start() -> (Arc<BridgeServer>, SocketAddr, UnboundedReceiver<OwnerCommand>) {
        let (handle, inbox) = BridgeHandle::channel();
        let server = Arc::new(BridgeServer::new(
            ServerConfig::default(),
            handle,
            Broadcaster::new(),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let running = server.clone();
        tokio::spawn(async move { running.serve(listener).await });

        (server, addr, inbox)
    }

    async fn connect(server: &BridgeServer, addr: SocketAddr) -> Client {
        let expected = server.connection_count() + 1;
        let (client, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        wait_until(|| server.connection_count() == expected).await;
        client
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    async fn next_text(client: &mut Client) -> serde_json::Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_action_ack_round_trip() {
        let (server, addr, mut inbox) = start().await;
        let mut client = connect(&server, addr).await;

        let action = r#"{"type":"action","forward":1,"strafe":0,"yaw":0,"pitch":0,
            "jump":false,"attack":false,"use":false,"sneak":false,"sprint":false,"duration_ms":100}"#;
        client.send(Message::Text(action.to_string())).await.unwrap();

        let cmd = tokio::time::timeout(Duration::from_secs(5), inbox.recv())
            .await
            .unwrap()
            .unwrap();
        match cmd {
            OwnerCommand::Apply { command, ack } => {
                assert_eq!(command.forward(), 1.0);
                assert_eq!(command.duration_ms(), 100);
                ack.send(Acknowledgment::completed()).unwrap();
            }
            _ => panic!("expected apply"),
        }

        let ack = next_text(&mut client).await;
        assert_eq!(ack["type"], "ack");
        assert_eq!(ack["action_type"], "action");
        assert_eq!(ack["success"], true);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_malformed_message_gets_failure_ack() {
        let (server, addr, _inbox) = start().await;
        let mut client = connect(&server, addr).await;

        client.send(Message::Text("{\"type\":\"action\"}".to_string())).await.unwrap();
        let ack = next_text(&mut client).await;
        assert_eq!(ack["action_type"], "unknown");
        assert_eq!(ack["success"], false);
        assert!(ack["error"].as_str().unwrap().contains("missing field"));

        // Connection stays usable.
        client.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
        let ack = next_text(&mut client).await;
        assert_eq!(ack["success"], false);
        assert_eq!(server.connection_count(), 1);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_dropped_ack_reports_owner_not_ready() {
        let (server, addr, mut inbox) = start().await;
        let mut client = connect(&server, addr).await;

        let action = r#"{"type":"action","forward":0,"strafe":0,"yaw":0,"pitch":0,
            "jump":false,"attack":true,"use":false,"sneak":false,"sprint":false,"duration_ms":50}"#;
        client.send(Message::Text(action.to_string())).await.unwrap();
        drop(inbox.recv().await.unwrap());

        let ack = next_text(&mut client).await;
        assert_eq!(ack["success"], false);
        assert_eq!(ack["error"], OWNER_NOT_READY);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_frame_config_reaches_owner() {
        let (server, addr, mut inbox) = start().await;
        let mut client = connect(&server, addr).await;

        let json = r#"{"type":"frame_config","enabled":true,"width":854,"height":480,
            "captureEveryNFrames":2,"jpegQuality":0.75}"#;
        client.send(Message::Text(json.to_string())).await.unwrap();

        let cmd = tokio::time::timeout(Duration::from_secs(5), inbox.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            cmd,
            OwnerCommand::ConfigureFrames(c) if c == FrameConfig::new(true, 854, 480, 2, 0.75)
        ));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_frames_fan_out_and_disconnect_is_local() {
        let (server, addr, _inbox) = start().await;
        let mut first = connect(&server, addr).await;
        let mut second = connect(&server, addr).await;
        let broadcaster = server.broadcaster();

        let frame = EncodedFrame {
            sequence: 7,
            timestamp_ms: 1234,
            payload: vec![0xFF, 0xD8, 0xAA, 0xFF, 0xD9],
        };
        assert_eq!(broadcaster.broadcast_frame(&frame), 2);

        for client in [&mut first, &mut second] {
            let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            let Message::Binary(bytes) = msg else {
                panic!("expected binary frame");
            };
            assert_eq!(bytes.len(), FrameHeader::SIZE + 5);
            assert_eq!(decode_frame_message(&bytes).unwrap(), frame);
        }

        first.close(None).await.unwrap();
        wait_until(|| server.connection_count() == 1).await;

        assert_eq!(broadcaster.broadcast_state(&WorldSnapshot::default()), 1);
        let state = next_text(&mut second).await;
        assert_eq!(state["type"], "state");

        server.shutdown();
    }

    #[test]
    fn test_broadcast_without_connections() {
        let broadcaster = Broadcaster::new();
        let frame = EncodedFrame { sequence: 1, timestamp_ms: 0, payload: vec![] };
        assert_eq!(broadcaster.broadcast_frame(&frame), 0);
        assert_eq!(broadcaster.frames_sent(), 1);
        assert_eq!(broadcaster.connection_count(), 0);
    }

    #[test]
    fn test_default_binds_loopback_port() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8765");
        assert_eq!(config.outbound_queue, 64);
    }
}
