//! Wire protocol for room synchronization.
//!
//! Every message on the wire is a bincode-encoded [`Frame`]: the sender's
//! id plus one [`RoomEvent`]. Events form a closed sum type, so inbound
//! dispatch is a total match — there is no "unknown event kind" branch at
//! runtime; anything that fails to decode is dropped at the frame
//! boundary instead.
//!
//! Delivery is per-sender FIFO only. Two participants editing the same
//! file may have their `FileUpdated` frames interleaved in either order at
//! a third participant; the last one applied wins (field-level overwrite,
//! no merge).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tandem_core::NodeSnapshot;

/// Participant identity with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
}

impl UserInfo {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
        }
    }

    /// Create with an explicit id (the id travels with every frame, so
    /// remote roster entries are rebuilt from it).
    pub fn with_id(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// Every event that crosses the room boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoomEvent {
    /// Client → server: initiate a join.
    JoinRequest { username: String, room_id: String },

    /// Server → client: authoritative snapshot on successful join.
    Sync {
        tree: NodeSnapshot,
        users: Vec<UserInfo>,
    },

    /// Roster deltas.
    UserJoined { user: UserInfo },
    UserDisconnected { user_id: Uuid },

    /// Ephemeral presence, scoped to the sender's active file. The pause
    /// is debounced at the sender, so receivers mirror the sender's
    /// last-announced state without their own timers.
    TypingStart { cursor: Option<u64> },
    TypingPause,

    /// Content overwrite (fires on every keystroke, no batching).
    FileUpdated { file_id: Uuid, content: String },

    /// Structural deltas. Creations carry the id minted at the
    /// originating participant so all copies share node identity.
    FileCreated {
        parent_id: Uuid,
        file_id: Uuid,
        name: String,
    },
    FileRenamed { file_id: Uuid, new_name: String },
    FileDeleted { file_id: Uuid },
    DirectoryCreated {
        parent_id: Uuid,
        dir_id: Uuid,
        name: String,
    },
    DirectoryRenamed { dir_id: Uuid, new_name: String },
    DirectoryDeleted { dir_id: Uuid },
    /// Wholesale child-list replacement (batch restore), not a field edit.
    DirectoryUpdated {
        dir_id: Uuid,
        children: Vec<NodeSnapshot>,
    },
}

impl RoomEvent {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRequest { .. } => "join_request",
            Self::Sync { .. } => "sync",
            Self::UserJoined { .. } => "user_joined",
            Self::UserDisconnected { .. } => "user_disconnected",
            Self::TypingStart { .. } => "typing_start",
            Self::TypingPause => "typing_pause",
            Self::FileUpdated { .. } => "file_updated",
            Self::FileCreated { .. } => "file_created",
            Self::FileRenamed { .. } => "file_renamed",
            Self::FileDeleted { .. } => "file_deleted",
            Self::DirectoryCreated { .. } => "directory_created",
            Self::DirectoryRenamed { .. } => "directory_renamed",
            Self::DirectoryDeleted { .. } => "directory_deleted",
            Self::DirectoryUpdated { .. } => "directory_updated",
        }
    }

    /// Whether applying this event can remove nodes from the tree, which
    /// obliges the caller to prune dangling editing-context references.
    pub fn removes_nodes(&self) -> bool {
        matches!(
            self,
            Self::FileDeleted { .. }
                | Self::DirectoryDeleted { .. }
                | Self::DirectoryUpdated { .. }
        )
    }
}

/// Top-level wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub sender: Uuid,
    pub event: RoomEvent,
}

impl Frame {
    pub fn new(sender: Uuid, event: RoomEvent) -> Self {
        Self { sender, event }
    }

    /// Frames originated by the server (SYNC) carry the nil sender.
    pub fn server(event: RoomEvent) -> Self {
        Self {
            sender: Uuid::nil(),
            event,
        }
    }

    /// Serialize to binary wire format.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Deserialize from binary wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (frame, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| ProtocolError::Decode(e.to_string()))?;
        Ok(frame)
    }
}

/// Protocol errors.
#[derive(Debug, Clone)]
pub enum ProtocolError {
    Encode(String),
    Decode(String),
    ConnectionClosed,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::ConnectionClosed => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for ProtocolError {}
