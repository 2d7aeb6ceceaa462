//! Fan-out broadcast to the other participants of a room.
//!
//! One tokio broadcast channel per room. Each connection subscribes on
//! join and filters out frames it sent itself; frames are encoded once
//! and shared as `Arc<Vec<u8>>` so a room with N participants costs one
//! serialization per event, not N.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::protocol::{Frame, ProtocolError, UserInfo};

/// Statistics for monitoring fan-out health.
#[derive(Debug, Clone, Default)]
pub struct BroadcastStats {
    pub frames_sent: u64,
    pub active_peers: usize,
}

/// A broadcast group for a single room.
pub struct BroadcastGroup {
    sender: broadcast::Sender<Arc<Vec<u8>>>,
    /// Connected participants, keyed by client id.
    peers: Arc<RwLock<HashMap<Uuid, UserInfo>>>,
    /// Frames buffered per receiver before lagging peers drop.
    capacity: usize,
    frames_sent: AtomicU64,
}

impl BroadcastGroup {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            peers: Arc::new(RwLock::new(HashMap::new())),
            capacity,
            frames_sent: AtomicU64::new(0),
        }
    }

    /// Register a participant and hand back their receiver.
    pub async fn add_peer(&self, info: UserInfo) -> broadcast::Receiver<Arc<Vec<u8>>> {
        let mut peers = self.peers.write().await;
        peers.insert(info.id, info);
        self.sender.subscribe()
    }

    pub async fn remove_peer(&self, peer_id: Uuid) -> Option<UserInfo> {
        let mut peers = self.peers.write().await;
        peers.remove(&peer_id)
    }

    /// Encode once and fan out to every subscriber. Receivers filter
    /// the sender's own frames; returns the subscriber count reached.
    pub fn broadcast_frame(&self, frame: &Frame) -> Result<usize, ProtocolError> {
        let encoded = Arc::new(frame.encode()?);
        Ok(self.broadcast_raw(encoded))
    }

    /// Pre-encoded fast path. Lock-free.
    pub fn broadcast_raw(&self, encoded: Arc<Vec<u8>>) -> usize {
        let count = self.sender.send(encoded).unwrap_or(0);
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        count
    }

    /// Raw receiver without registering a participant (the joining
    /// connection subscribes before its UserJoined announcement).
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Vec<u8>>> {
        self.sender.subscribe()
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Roster snapshot for a SYNC payload.
    pub async fn peers(&self) -> Vec<UserInfo> {
        self.peers.read().await.values().cloned().collect()
    }

    pub async fn has_peer(&self, peer_id: Uuid) -> bool {
        self.peers.read().await.contains_key(&peer_id)
    }

    pub async fn stats(&self) -> BroadcastStats {
        let peers = self.peers.read().await;
        BroadcastStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            active_peers: peers.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
