//! # tandem-collab — Real-time sync layer for Tandem
//!
//! WebSocket-based multiplayer editing of a shared file tree, with
//! last-write-wins convergence per field.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     WebSocket      ┌─────────────┐
//! │ RoomSession  │ ◄────────────────► │ SyncServer  │
//! │ (per user)   │    Binary Frames   │ (central)   │
//! └──────┬───────┘                    └──────┬──────┘
//!        │                                   │
//!        ▼                                   ▼
//! ┌──────────────┐                    ┌─────────────┐
//! │ RoomState    │                    │ RoomState   │
//! │ (local copy) │                    │ (authority) │
//! └──────────────┘                    └──────┬──────┘
//!                                            │
//!                                    ┌───────┴───────┐
//!                                    │ BroadcastGroup│
//!                                    │ (fan-out)     │
//!                                    └───────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — Binary wire protocol (bincode-encoded frames)
//! - [`session`] — Join lifecycle and the local participant's session
//! - [`room`] — Shared room state, total inbound application
//! - [`presence`] — Roster of remote participants
//! - [`typing`] — Debounced typing-pause timer
//! - [`sink`] — Outbound connection boundary ([`EventSink`])
//! - [`client`] — WebSocket transport client
//! - [`broadcast`] — Room-based fan-out with backpressure
//! - [`server`] — WebSocket sync server

pub mod broadcast;
pub mod client;
pub mod presence;
pub mod protocol;
pub mod room;
pub mod server;
pub mod session;
pub mod sink;
pub mod typing;

// Re-exports for convenience
pub use broadcast::{BroadcastGroup, BroadcastStats};
pub use client::{ClientEvent, ConnectionState, SyncClient, WsSink};
pub use presence::{RemoteUser, Roster};
pub use protocol::{Frame, ProtocolError, RoomEvent, UserInfo};
pub use room::RoomState;
pub use server::{ServerConfig, ServerStats, SyncServer, STARTER_FILE};
pub use session::{
    JoinForm, ReentryAction, RoomSession, SessionStatus, ValidationError,
};
pub use sink::{EventSink, RecordingSink};
pub use typing::{PauseTimer, PAUSE_DELAY};
