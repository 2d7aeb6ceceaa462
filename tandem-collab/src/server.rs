//! WebSocket sync server with room-based routing.
//!
//! Architecture:
//! ```text
//! Client A ──┐
//!             ├── Room (room id) ── RoomState ── BroadcastGroup
//! Client B ──┘        │
//!                     ├── authoritative FsTree (in memory)
//!                     └── roster
//! ```
//!
//! Each room keeps an authoritative copy of the file tree and roster,
//! built by applying the same events it relays. A joining participant
//! receives one SYNC frame with the tree snapshot and the roster as it
//! stood before their arrival; everything after that is fan-out. Room
//! state lives only as long as the room has participants.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use tandem_core::NodeSnapshot;

use crate::broadcast::BroadcastGroup;
use crate::protocol::{Frame, RoomEvent, UserInfo};
use crate::room::RoomState;

/// Name of the single starter file every fresh room begins with.
pub const STARTER_FILE: &str = "index.js";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_peers_per_room: usize,
    /// Broadcast channel capacity per room.
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9090".to_string(),
            max_peers_per_room: 100,
            broadcast_capacity: 256,
        }
    }
}

/// Server statistics.
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub total_frames: u64,
    pub total_bytes: u64,
    pub active_rooms: usize,
}

/// One room: authoritative state plus fan-out.
struct CollabRoom {
    state: RoomState,
    broadcast: Arc<BroadcastGroup>,
}

impl CollabRoom {
    fn new(broadcast_capacity: usize) -> Self {
        // The server is nobody's local participant; the nil id keeps
        // the roster from excluding anyone.
        let mut state = RoomState::new(Uuid::nil());
        if let Err(e) = state.tree.create_file(state.tree.root(), STARTER_FILE) {
            log::error!("starter file creation failed: {e}");
        }
        Self {
            state,
            broadcast: Arc::new(BroadcastGroup::new(broadcast_capacity)),
        }
    }
}

/// The sync server.
pub struct SyncServer {
    config: ServerConfig,
    rooms: Arc<RwLock<HashMap<String, CollabRoom>>>,
    stats: Arc<RwLock<ServerStats>>,
}

impl SyncServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            rooms: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(ServerStats::default())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default())
    }

    /// Bind the configured address and serve forever.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        log::info!("sync server listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Accept loop over an already-bound listener (tests bind port 0).
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            let (stream, addr) = listener.accept().await?;
            log::debug!("new TCP connection from {addr}");

            let rooms = self.rooms.clone();
            let stats = self.stats.clone();
            let config = self.config.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, addr, rooms, stats, config).await {
                    log::error!("connection error from {addr}: {e}");
                }
            });
        }
    }

    /// Handle a single WebSocket connection.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        rooms: Arc<RwLock<HashMap<String, CollabRoom>>>,
        stats: Arc<RwLock<ServerStats>>,
        config: ServerConfig,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ws_stream = tokio_tungstenite::accept_async(stream).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        log::info!("WebSocket connection established from {addr}");
        {
            let mut s = stats.write().await;
            s.total_connections += 1;
            s.active_connections += 1;
        }

        // Set on the first JOIN_REQUEST.
        let mut peer_id: Option<Uuid> = None;
        let mut room_id: Option<String> = None;
        let mut broadcast_rx: Option<tokio::sync::broadcast::Receiver<Arc<Vec<u8>>>> = None;

        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Binary(data))) => {
                            let frame = match Frame::decode(&data) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    log::warn!("undecodable frame from {addr}: {e}");
                                    continue;
                                }
                            };
                            {
                                let mut s = stats.write().await;
                                s.total_frames += 1;
                                s.total_bytes += data.len() as u64;
                            }

                            match frame.event {
                                RoomEvent::JoinRequest { username, room_id: rid } => {
                                    let mut rooms_w = rooms.write().await;
                                    let room = rooms_w
                                        .entry(rid.clone())
                                        .or_insert_with(|| CollabRoom::new(config.broadcast_capacity));

                                    if room.broadcast.peer_count().await >= config.max_peers_per_room {
                                        log::warn!("room {rid} full, rejecting {username}");
                                        break;
                                    }

                                    let info = UserInfo::with_id(frame.sender, username);

                                    // Snapshot tree and roster before this
                                    // participant is added, so the SYNC lists
                                    // only the others.
                                    let sync = Frame::server(RoomEvent::Sync {
                                        tree: room.state.tree.to_snapshot(),
                                        users: room.state.roster.infos(),
                                    });

                                    let rx = room.broadcast.add_peer(info.clone()).await;
                                    broadcast_rx = Some(rx);
                                    room.state.roster.user_joined(info.clone());
                                    peer_id = Some(info.id);
                                    room_id = Some(rid.clone());

                                    let joined = Frame::new(info.id, RoomEvent::UserJoined { user: info.clone() });
                                    let broadcast = room.broadcast.clone();
                                    let room_count = rooms_w.len();
                                    drop(rooms_w); // release lock before await

                                    let encoded = sync.encode()?;
                                    ws_sender.send(Message::Binary(encoded.into())).await?;
                                    let _ = broadcast.broadcast_frame(&joined);

                                    {
                                        let mut s = stats.write().await;
                                        s.active_rooms = room_count;
                                    }
                                    log::info!("{} ({}) joined room {rid}", info.username, info.id);
                                }

                                ref event => {
                                    let Some(ref rid) = room_id else {
                                        log::debug!("frame {} before join from {addr}", event.kind());
                                        continue;
                                    };
                                    let broadcast = {
                                        let mut rooms_w = rooms.write().await;
                                        match rooms_w.get_mut(rid) {
                                            Some(room) => {
                                                room.state.apply(frame.sender, event);
                                                Some(room.broadcast.clone())
                                            }
                                            None => None,
                                        }
                                    };
                                    if let Some(broadcast) = broadcast {
                                        broadcast.broadcast_raw(Arc::new(data.to_vec()));
                                    }
                                }
                            }
                        }

                        Some(Ok(Message::Close(_))) | None => {
                            log::info!("connection closed from {addr}");
                            break;
                        }

                        Some(Ok(Message::Ping(data))) => {
                            ws_sender.send(Message::Pong(data)).await?;
                        }

                        Some(Err(e)) => {
                            log::error!("WebSocket error from {addr}: {e}");
                            break;
                        }

                        _ => {}
                    }
                }

                msg = async {
                    match broadcast_rx {
                        Some(ref mut rx) => rx.recv().await,
                        // Not joined yet: wait forever.
                        None => std::future::pending().await,
                    }
                } => {
                    match msg {
                        Ok(data) => {
                            // Don't echo back to the sender.
                            if let Ok(frame) = Frame::decode(&data) {
                                if Some(frame.sender) == peer_id {
                                    continue;
                                }
                            }
                            ws_sender.send(Message::Binary(data.to_vec().into())).await?;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            log::warn!("peer {peer_id:?} lagged by {n} frames");
                        }
                        Err(_) => break,
                    }
                }
            }
        }

        // Cleanup: announce the departure and drop empty rooms.
        if let (Some(pid), Some(rid)) = (peer_id, room_id) {
            let mut rooms_w = rooms.write().await;
            if let Some(room) = rooms_w.get_mut(&rid) {
                room.broadcast.remove_peer(pid).await;
                room.state.roster.user_disconnected(pid);

                let leave = Frame::new(pid, RoomEvent::UserDisconnected { user_id: pid });
                let _ = room.broadcast.broadcast_frame(&leave);

                if room.broadcast.peer_count().await == 0 {
                    rooms_w.remove(&rid);
                    log::info!("room {rid} removed (empty)");
                }
            }
            let mut s = stats.write().await;
            s.active_connections -= 1;
            s.active_rooms = rooms_w.len();
        } else {
            let mut s = stats.write().await;
            s.active_connections -= 1;
        }

        Ok(())
    }

    /// Server-wide statistics snapshot.
    pub async fn stats(&self) -> ServerStats {
        self.stats.read().await.clone()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Tree snapshot of a room's authoritative state, if it exists.
    pub async fn room_snapshot(&self, room_id: &str) -> Option<NodeSnapshot> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(|r| r.state.tree.to_snapshot())
    }

    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:9090");
        assert_eq!(config.max_peers_per_room, 100);
        assert_eq!(config.broadcast_capacity, 256);
    }

    #[tokio::test]
    async fn test_fresh_room_has_starter_file() {
        let room = CollabRoom::new(16);
        let snapshot = room.state.tree.to_snapshot();
        assert_eq!(snapshot.children.len(), 1);
        assert_eq!(snapshot.children[0].name, STARTER_FILE);
    }

    #[tokio::test]
    async fn test_server_starts_empty() {
        let server = SyncServer::with_defaults();
        assert_eq!(server.room_count().await, 0);
        let stats = server.stats().await;
        assert_eq!(stats.total_connections, 0);
        assert!(server.room_snapshot("nowhere").await.is_none());
    }
}
