//! Identity, join lifecycle, and the local participant's session.
//!
//! State machine: `Initial → AttemptingJoin → Joined → Disconnected`,
//! re-enterable by reconnecting. The session owns the room state, the
//! editing context, and the typing-pause timer, and is the only producer
//! of outbound frames — everything goes through the injected
//! [`EventSink`], so the whole component runs against a fake connection
//! in tests.
//!
//! Local mutation is optimistic: a change lands in the local tree first,
//! then is announced exactly once. Convergence across copies is eventual
//! and protocol-driven; simultaneous edits of one file resolve to
//! whichever update each copy processes last.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use tandem_core::{ArchiveEntry, EditContext, FsError, FsTree, NodeSnapshot};

use crate::protocol::{Frame, RoomEvent, UserInfo};
use crate::room::RoomState;
use crate::sink::EventSink;
use crate::typing::PauseTimer;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_ROOM_ID_LEN: usize = 5;

/// Join-form rejection, surfaced to the user. No protocol traffic is
/// generated for any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    EmptyUsername,
    EmptyRoomId,
    RoomIdTooShort,
    UsernameTooShort,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "Enter your username"),
            Self::EmptyRoomId => write!(f, "Enter a room id"),
            Self::RoomIdTooShort => {
                write!(f, "Room id must be at least {MIN_ROOM_ID_LEN} characters long")
            }
            Self::UsernameTooShort => {
                write!(f, "Username must be at least {MIN_USERNAME_LEN} characters long")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// What the user typed into the join form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinForm {
    pub username: String,
    pub room_id: String,
}

impl JoinForm {
    pub fn new(username: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            room_id: room_id.into(),
        }
    }

    /// Checks run in form order: empty fields first, then lengths.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if self.room_id.is_empty() {
            return Err(ValidationError::EmptyRoomId);
        }
        if self.room_id.chars().count() < MIN_ROOM_ID_LEN {
            return Err(ValidationError::RoomIdTooShort);
        }
        if self.username.chars().count() < MIN_USERNAME_LEN {
            return Err(ValidationError::UsernameTooShort);
        }
        Ok(())
    }

    /// Fresh collision-resistant room id for the "create room" affordance.
    pub fn generate_room_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Connection-lifecycle position of the local participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initial,
    AttemptingJoin,
    Joined,
    Disconnected,
}

/// What the page shell should do when the editor view is (re-)entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReentryAction {
    /// Genuine fresh arrival: proceed with current state.
    Proceed,
    /// Page-level re-entry after having joined once in this tab: local
    /// state may be stale, cycle the connection to force a clean re-SYNC.
    CycleConnection,
}

/// The local participant's room session.
pub struct RoomSession<S: EventSink> {
    user: UserInfo,
    room_id: String,
    status: SessionStatus,
    state: RoomState,
    edit: EditContext,
    sink: Arc<S>,
    pause: PauseTimer,
    redirect_pending: bool,
}

impl<S: EventSink> RoomSession<S> {
    /// `client_id` must match the id the transport stamps on outbound
    /// frames, so peers and the echo filter agree on who we are.
    pub fn new(client_id: Uuid, sink: Arc<S>) -> Self {
        Self {
            user: UserInfo::with_id(client_id, ""),
            room_id: String::new(),
            status: SessionStatus::Initial,
            state: RoomState::new(client_id),
            edit: EditContext::new(),
            sink,
            pause: PauseTimer::new(),
            redirect_pending: false,
        }
    }

    /// Custom typing-pause window (tests use short ones).
    pub fn with_pause_delay(client_id: Uuid, sink: Arc<S>, delay: Duration) -> Self {
        let mut session = Self::new(client_id, sink);
        session.pause = PauseTimer::with_delay(delay);
        session
    }

    // ── Join lifecycle ──────────────────────────────────────────────

    /// Submit the join form.
    ///
    /// Returns `Ok(true)` when a JOIN_REQUEST was sent. While a join is
    /// already in flight (or complete) this is a local no-op, `Ok(false)`,
    /// preventing double-registration on the server. Validation failures
    /// produce no traffic and no transition.
    pub fn join(&mut self, form: &JoinForm) -> Result<bool, ValidationError> {
        if matches!(
            self.status,
            SessionStatus::AttemptingJoin | SessionStatus::Joined
        ) {
            log::debug!("join suppressed while {:?}", self.status);
            return Ok(false);
        }
        form.validate()?;

        self.user.username = form.username.clone();
        self.room_id = form.room_id.clone();
        if !self.emit(RoomEvent::JoinRequest {
            username: form.username.clone(),
            room_id: form.room_id.clone(),
        }) {
            return Ok(false);
        }
        self.status = SessionStatus::AttemptingJoin;
        log::info!("join requested: {} -> {}", form.username, form.room_id);
        Ok(true)
    }

    /// Re-request membership after a reconnect, reusing the identity from
    /// the last successful `join`. No-op unless currently disconnected
    /// with a valid stored identity.
    pub fn rejoin(&mut self) -> bool {
        if self.status != SessionStatus::Disconnected {
            return false;
        }
        let form = JoinForm::new(self.user.username.clone(), self.room_id.clone());
        if form.validate().is_err() {
            return false;
        }
        if self.emit(RoomEvent::JoinRequest {
            username: form.username,
            room_id: form.room_id,
        }) {
            self.status = SessionStatus::AttemptingJoin;
            true
        } else {
            false
        }
    }

    /// Transport noticed the connection dropped (or it was closed
    /// deliberately). All room state from this session is stale and will
    /// be discarded by the next SYNC.
    pub fn connection_lost(&mut self) {
        if self.status == SessionStatus::Disconnected {
            return;
        }
        self.pause.cancel();
        self.status = SessionStatus::Disconnected;
        log::info!("session disconnected from room {}", self.room_id);
    }

    /// Editor page (re-)entry. The one-shot redirect marker separates a
    /// genuine fresh join from a page-level re-entry in the same tab; on
    /// re-entry while joined, the session resets so the cycled connection
    /// re-SYNCs instead of trusting possibly-stale local state.
    pub fn on_editor_entry(&mut self) -> ReentryAction {
        if self.status != SessionStatus::Joined {
            return ReentryAction::Proceed;
        }
        if self.redirect_pending {
            self.redirect_pending = false;
            self.connection_lost();
            ReentryAction::CycleConnection
        } else {
            self.redirect_pending = true;
            ReentryAction::Proceed
        }
    }

    // ── Inbound ─────────────────────────────────────────────────────

    /// Apply one inbound frame. Total over all events; own frames echoed
    /// back by the fan-out are skipped.
    pub fn handle_frame(&mut self, frame: Frame) {
        if frame.sender == self.user.id {
            return;
        }
        match frame.event {
            RoomEvent::Sync { ref tree, ref users } => {
                // A SYNC arriving after a disconnect reset must not be
                // applied; only an in-flight join may consume it.
                if self.status != SessionStatus::AttemptingJoin {
                    log::debug!("ignoring SYNC while {:?}", self.status);
                    return;
                }
                self.state = RoomState::new(self.user.id);
                self.state.seed(tree, users.clone());
                self.edit.clear();
                self.status = SessionStatus::Joined;
                log::info!(
                    "joined room {}: {} nodes, {} peers",
                    self.room_id,
                    self.state.tree.len(),
                    self.state.roster.len()
                );
            }
            ref event => {
                if self.status != SessionStatus::Joined {
                    log::trace!("dropping {} while {:?}", event.kind(), self.status);
                    return;
                }
                self.state.apply(frame.sender, event);
                if event.removes_nodes() {
                    self.edit.prune(&self.state.tree);
                }
            }
        }
    }

    // ── Local edits (optimistic, announced exactly once) ────────────

    /// One keystroke in the active file: overwrite locally, announce the
    /// typing signal and the content immediately, restart the pause timer.
    pub fn local_edit(
        &mut self,
        file_id: Uuid,
        content: &str,
        cursor: Option<u64>,
    ) -> Result<(), FsError> {
        self.state.tree.update_file_content(file_id, content)?;
        self.emit(RoomEvent::TypingStart { cursor });
        self.emit(RoomEvent::FileUpdated {
            file_id,
            content: content.to_string(),
        });
        self.pause.restart(
            self.sink.clone(),
            Frame::new(self.user.id, RoomEvent::TypingPause),
        );
        Ok(())
    }

    pub fn create_file(&mut self, parent: Uuid, name: &str) -> Result<Uuid, FsError> {
        let file_id = self.state.tree.create_file(parent, name)?;
        self.emit(RoomEvent::FileCreated {
            parent_id: parent,
            file_id,
            name: name.to_string(),
        });
        Ok(file_id)
    }

    pub fn create_directory(&mut self, parent: Uuid, name: &str) -> Result<Uuid, FsError> {
        let dir_id = self.state.tree.create_directory(parent, name)?;
        self.emit(RoomEvent::DirectoryCreated {
            parent_id: parent,
            dir_id,
            name: name.to_string(),
        });
        Ok(dir_id)
    }

    /// `Ok(false)` on name collision — nothing changed, nothing announced,
    /// the caller shows inline feedback.
    pub fn rename_file(&mut self, file_id: Uuid, new_name: &str) -> Result<bool, FsError> {
        let renamed = self.state.tree.rename_file(file_id, new_name)?;
        if renamed {
            self.emit(RoomEvent::FileRenamed {
                file_id,
                new_name: new_name.to_string(),
            });
        }
        Ok(renamed)
    }

    pub fn rename_directory(&mut self, dir_id: Uuid, new_name: &str) -> Result<bool, FsError> {
        let renamed = self.state.tree.rename_directory(dir_id, new_name)?;
        if renamed {
            self.emit(RoomEvent::DirectoryRenamed {
                dir_id,
                new_name: new_name.to_string(),
            });
        }
        Ok(renamed)
    }

    pub fn delete_file(&mut self, file_id: Uuid) -> Result<(), FsError> {
        self.state.tree.delete_file(file_id)?;
        self.edit.prune(&self.state.tree);
        self.emit(RoomEvent::FileDeleted { file_id });
        Ok(())
    }

    /// Deletes the whole subtree. Open-file references into it go
    /// dangling and are pruned here before the announcement.
    pub fn delete_directory(&mut self, dir_id: Uuid) -> Result<Vec<Uuid>, FsError> {
        let removed = self.state.tree.delete_directory(dir_id)?;
        self.edit.prune(&self.state.tree);
        self.emit(RoomEvent::DirectoryDeleted { dir_id });
        Ok(removed)
    }

    pub fn update_directory(
        &mut self,
        dir_id: Uuid,
        children: Vec<NodeSnapshot>,
    ) -> Result<(), FsError> {
        self.state.tree.update_directory(dir_id, &children)?;
        self.edit.prune(&self.state.tree);
        self.emit(RoomEvent::DirectoryUpdated { dir_id, children });
        Ok(())
    }

    // ── Local-only view operations (never announced) ────────────────

    pub fn open_file(&mut self, file_id: Uuid) -> Result<(), FsError> {
        let node = self.state.tree.node(file_id).ok_or(FsError::NotFound)?;
        if !node.is_file() {
            return Err(FsError::NotAFile);
        }
        self.edit.open_file(file_id);
        Ok(())
    }

    pub fn close_file(&mut self, file_id: Uuid) {
        self.edit.close_file(file_id);
    }

    pub fn toggle_directory(&mut self, dir_id: Uuid) -> Result<bool, FsError> {
        self.state.tree.toggle_directory(dir_id)
    }

    pub fn collapse_directories(&mut self) {
        self.state.tree.collapse_directories();
    }

    /// Pure export of the current tree for local download.
    pub fn export_archive(&self) -> Vec<ArchiveEntry> {
        tandem_core::pack_tree(&self.state.tree)
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn user(&self) -> &UserInfo {
        &self.user
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn tree(&self) -> &FsTree {
        &self.state.tree
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    pub fn edit(&self) -> &EditContext {
        &self.edit
    }

    fn emit(&self, event: RoomEvent) -> bool {
        match self.sink.emit(Frame::new(self.user.id, event)) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("outbound frame dropped: {e}");
                false
            }
        }
    }
}
