//! WebSocket transport client for the sync server.
//!
//! Provides:
//! - Connection lifecycle (connect, disconnect, reconnect)
//! - Frame send/receive over binary WebSocket messages
//! - Echo filtering of the client's own frames
//!
//! The client owns the socket; the session never sees it. Outbound
//! traffic flows through a [`WsSink`] handed to the session, inbound
//! frames and connection transitions surface as [`ClientEvent`]s on a
//! channel the application pumps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::protocol::{Frame, ProtocolError};
use crate::sink::EventSink;

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Events surfaced to the application.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Connection established.
    Connected,
    /// Connection lost or closed.
    Disconnected,
    /// A frame from another participant (own frames are filtered out).
    Frame(Frame),
}

/// Send half of the connection, handed to the session.
///
/// `emit` never blocks: frames go onto an unbounded channel drained by
/// the writer task. While offline, frames are dropped with an error so
/// the caller can decide what to surface. The sender behind the sink is
/// swapped by the client on every disconnect/reconnect cycle, so one
/// sink held by a session stays bound to the current connection.
#[derive(Clone)]
pub struct WsSink {
    tx: Arc<Mutex<mpsc::UnboundedSender<Frame>>>,
    online: Arc<AtomicBool>,
}

impl EventSink for WsSink {
    fn emit(&self, frame: Frame) -> Result<(), ProtocolError> {
        if !self.connected() {
            return Err(ProtocolError::ConnectionClosed);
        }
        self.tx
            .lock()
            .map_err(|_| ProtocolError::ConnectionClosed)?
            .send(frame)
            .map_err(|_| ProtocolError::ConnectionClosed)
    }

    fn connected(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

/// The transport client.
///
/// One instance per tab; the id stamped on outbound frames is the same
/// id the session identifies as, so the reader task can drop our own
/// frames echoed back by the server fan-out.
pub struct SyncClient {
    id: Uuid,
    server_url: String,
    state: Arc<RwLock<ConnectionState>>,
    online: Arc<AtomicBool>,
    /// Current connection's sender, shared with every handed-out sink.
    outgoing_tx: Arc<Mutex<mpsc::UnboundedSender<Frame>>>,
    outgoing_rx: Option<mpsc::UnboundedReceiver<Frame>>,
    event_tx: mpsc::Sender<ClientEvent>,
    event_rx: Option<mpsc::Receiver<ClientEvent>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    reader_handle: Option<JoinHandle<()>>,
}

impl SyncClient {
    pub fn new(id: Uuid, server_url: impl Into<String>) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            id,
            server_url: server_url.into(),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            online: Arc::new(AtomicBool::new(false)),
            outgoing_tx: Arc::new(Mutex::new(outgoing_tx)),
            outgoing_rx: Some(outgoing_rx),
            event_tx,
            event_rx: Some(event_rx),
            shutdown_tx: None,
            reader_handle: None,
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<ClientEvent>> {
        self.event_rx.take()
    }

    /// The sink the session emits into. Valid across reconnects: the
    /// sender behind it is swapped to the fresh channel on every cycle.
    pub fn sink(&self) -> WsSink {
        WsSink {
            tx: self.outgoing_tx.clone(),
            online: self.online.clone(),
        }
    }

    /// Connect to the server and spawn the reader and writer tasks.
    pub async fn connect(&mut self) -> Result<(), ProtocolError> {
        let outgoing_rx = match self.outgoing_rx.take() {
            Some(rx) => rx,
            // Still connected, or the old writer holds the receiver
            // after an unexpected drop: cycle through disconnect first.
            None => return Err(ProtocolError::ConnectionClosed),
        };

        *self.state.write().await = ConnectionState::Connecting;
        let ws_stream = match tokio_tungstenite::connect_async(&self.server_url).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                log::warn!("connect to {} failed: {e}", self.server_url);
                *self.state.write().await = ConnectionState::Disconnected;
                self.outgoing_rx = Some(outgoing_rx);
                return Err(ProtocolError::ConnectionClosed);
            }
        };
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);
        self.online.store(true, Ordering::Relaxed);
        *self.state.write().await = ConnectionState::Connected;
        let _ = self.event_tx.send(ClientEvent::Connected).await;
        log::info!("connected to {}", self.server_url);

        // Writer task: drain the frame channel into the socket until
        // the channel closes or a deliberate shutdown is signalled.
        tokio::spawn(async move {
            let mut outgoing_rx = outgoing_rx;
            loop {
                tokio::select! {
                    frame = outgoing_rx.recv() => {
                        let Some(frame) = frame else { break };
                        let encoded = match frame.encode() {
                            Ok(bytes) => bytes,
                            Err(e) => {
                                log::warn!("dropping unencodable frame: {e}");
                                continue;
                            }
                        };
                        if ws_writer.send(Message::Binary(encoded.into())).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        let _ = ws_writer.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            let _ = ws_writer.close().await;
        });

        // Reader task: decode inbound frames, filter our own echoes.
        let event_tx = self.event_tx.clone();
        let state = self.state.clone();
        let online = self.online.clone();
        let own_id = self.id;
        self.reader_handle = Some(tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Binary(data)) => match Frame::decode(&data) {
                        Ok(frame) => {
                            if frame.sender == own_id {
                                continue;
                            }
                            if event_tx.send(ClientEvent::Frame(frame)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => log::warn!("undecodable frame from server: {e}"),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
            online.store(false, Ordering::Relaxed);
            *state.write().await = ConnectionState::Disconnected;
            let _ = event_tx.send(ClientEvent::Disconnected).await;
            log::info!("connection closed");
        }));

        Ok(())
    }

    /// Close the connection deliberately. Signals the writer task to
    /// send a Close frame and shut the socket down, then waits for the
    /// reader to drain so the server has observed the departure before
    /// this returns. The reader surfaces [`ClientEvent::Disconnected`].
    pub async fn disconnect(&mut self) {
        let Some(shutdown) = self.shutdown_tx.take() else {
            return;
        };
        self.online.store(false, Ordering::Relaxed);
        *self.state.write().await = ConnectionState::Disconnected;
        let _ = shutdown.send(true);
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.await;
        }
        // Re-arm a fresh outgoing channel for the next connect and
        // point every live sink at it.
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut current) = self.outgoing_tx.lock() {
            *current = tx;
        }
        self.outgoing_rx = Some(rx);
        log::info!("disconnected from {}", self.server_url);
    }

    /// Disconnect-then-connect cycle, used on editor re-entry to force
    /// a clean re-SYNC.
    pub async fn reconnect(&mut self) -> Result<(), ProtocolError> {
        self.disconnect().await;
        *self.state.write().await = ConnectionState::Reconnecting;
        self.connect().await
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RoomEvent;

    #[test]
    fn test_client_creation() {
        let id = Uuid::new_v4();
        let client = SyncClient::new(id, "ws://localhost:9090");
        assert_eq!(client.id(), id);
        assert_eq!(client.server_url(), "ws://localhost:9090");
        assert!(!client.is_online());
    }

    #[tokio::test]
    async fn test_client_initial_state() {
        let client = SyncClient::new(Uuid::new_v4(), "ws://localhost:9090");
        assert_eq!(
            client.connection_state().await,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_take_event_rx_is_one_shot() {
        let mut client = SyncClient::new(Uuid::new_v4(), "ws://localhost:9090");
        assert!(client.take_event_rx().is_some());
        assert!(client.take_event_rx().is_none());
    }

    #[test]
    fn test_sink_rejects_while_offline() {
        let client = SyncClient::new(Uuid::new_v4(), "ws://localhost:9090");
        let sink = client.sink();
        assert!(!sink.connected());
        let result = sink.emit(Frame::new(client.id(), RoomEvent::TypingPause));
        assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_disconnect_before_connect_is_noop() {
        let mut client = SyncClient::new(Uuid::new_v4(), "ws://localhost:9090");
        client.disconnect().await;
        assert!(client.outgoing_rx.is_some());
        assert_eq!(
            client.connection_state().await,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_server_fails_cleanly() {
        // Port 9 (discard) is a safe dead endpoint.
        let mut client = SyncClient::new(Uuid::new_v4(), "ws://127.0.0.1:9");
        assert!(client.connect().await.is_err());
        assert_eq!(
            client.connection_state().await,
            ConnectionState::Disconnected
        );
        // The outgoing channel is still armed for a retry.
        assert!(client.outgoing_rx.is_some());
    }
}
