//! Roster of remote participants and their ephemeral status.
//!
//! Tracks everyone in the room except the local participant. Typing and
//! cursor annotations are updated in place from protocol events and never
//! persisted; the typing flag clears when the sender's debounced
//! TYPING_PAUSE arrives, so this side holds no timers of its own and
//! always mirrors the sender's last-announced state.

use std::collections::HashMap;

use uuid::Uuid;

use crate::protocol::UserInfo;

/// A remote participant as seen locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub info: UserInfo,
    pub typing: bool,
    /// Offset into the file the participant is typing in, if announced.
    pub cursor: Option<u64>,
}

impl RemoteUser {
    fn new(info: UserInfo) -> Self {
        Self {
            info,
            typing: false,
            cursor: None,
        }
    }
}

/// All remote participants of the current room.
#[derive(Debug, Clone)]
pub struct Roster {
    local_id: Uuid,
    users: HashMap<Uuid, RemoteUser>,
}

impl Roster {
    pub fn new(local_id: Uuid) -> Self {
        Self {
            local_id,
            users: HashMap::new(),
        }
    }

    /// Seed from a SYNC roster, discarding anything stale.
    pub fn seed(&mut self, users: Vec<UserInfo>) {
        self.users.clear();
        for user in users {
            self.user_joined(user);
        }
    }

    /// Add a participant. The local participant is never listed.
    pub fn user_joined(&mut self, user: UserInfo) {
        if user.id == self.local_id {
            return;
        }
        log::debug!("roster: {} joined", user.username);
        self.users.insert(user.id, RemoteUser::new(user));
    }

    pub fn user_disconnected(&mut self, user_id: Uuid) {
        if self.users.remove(&user_id).is_some() {
            log::debug!("roster: {user_id} disconnected");
        }
    }

    /// Mark a participant as typing at the given cursor offset.
    ///
    /// A typing signal from an unknown id creates a placeholder entry —
    /// the participant may have joined before we finished syncing.
    pub fn typing_start(&mut self, user_id: Uuid, cursor: Option<u64>) {
        if user_id == self.local_id {
            return;
        }
        let entry = self.users.entry(user_id).or_insert_with(|| {
            let short = &user_id.to_string()[..8];
            RemoteUser::new(UserInfo::with_id(user_id, format!("peer-{short}")))
        });
        entry.typing = true;
        entry.cursor = cursor;
    }

    pub fn typing_pause(&mut self, user_id: Uuid) {
        if let Some(user) = self.users.get_mut(&user_id) {
            user.typing = false;
        }
    }

    pub fn get(&self, user_id: Uuid) -> Option<&RemoteUser> {
        self.users.get(&user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// All remote users, unordered.
    pub fn users(&self) -> impl Iterator<Item = &RemoteUser> {
        self.users.values()
    }

    /// Identity list for a SYNC payload.
    pub fn infos(&self) -> Vec<UserInfo> {
        self.users.values().map(|u| u.info.clone()).collect()
    }

    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_disconnect() {
        let mut roster = Roster::new(Uuid::new_v4());
        let bob = UserInfo::new("bob");
        roster.user_joined(bob.clone());
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(bob.id).unwrap().info.username, "bob");

        roster.user_disconnected(bob.id);
        assert!(roster.is_empty());
    }

    #[test]
    fn test_local_user_never_listed() {
        let local = UserInfo::new("me");
        let mut roster = Roster::new(local.id);
        roster.user_joined(local.clone());
        assert!(roster.is_empty());
        roster.typing_start(local.id, Some(3));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_typing_flag_updates_in_place() {
        let mut roster = Roster::new(Uuid::new_v4());
        let bob = UserInfo::new("bob");
        roster.user_joined(bob.clone());

        roster.typing_start(bob.id, Some(42));
        let user = roster.get(bob.id).unwrap();
        assert!(user.typing);
        assert_eq!(user.cursor, Some(42));

        roster.typing_pause(bob.id);
        assert!(!roster.get(bob.id).unwrap().typing);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_typing_from_unknown_creates_placeholder() {
        let mut roster = Roster::new(Uuid::new_v4());
        let stranger = Uuid::new_v4();
        roster.typing_start(stranger, None);

        let user = roster.get(stranger).unwrap();
        assert!(user.typing);
        assert!(user.info.username.starts_with("peer-"));
    }

    #[test]
    fn test_pause_for_unknown_is_noop() {
        let mut roster = Roster::new(Uuid::new_v4());
        roster.typing_pause(Uuid::new_v4());
        assert!(roster.is_empty());
    }

    #[test]
    fn test_seed_replaces_stale_entries() {
        let mut roster = Roster::new(Uuid::new_v4());
        roster.user_joined(UserInfo::new("stale"));

        let fresh = vec![UserInfo::new("alice"), UserInfo::new("bob")];
        roster.seed(fresh.clone());
        assert_eq!(roster.len(), 2);
        let names: Vec<String> = roster.users().map(|u| u.info.username.clone()).collect();
        assert!(names.contains(&"alice".to_string()));
        assert!(!names.contains(&"stale".to_string()));
    }
}
