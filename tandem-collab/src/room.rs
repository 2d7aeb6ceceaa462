//! Shared room state and total inbound application.
//!
//! One [`RoomState`] is the pair every participant (and the relay server)
//! keeps: the file tree plus the presence roster. [`RoomState::apply`] is
//! the inbound dispatch table — a total match over [`RoomEvent`] in which
//! absent ids and kind mismatches are no-ops, never failures, so a late
//! or malformed remote event during a reconnect window cannot take the
//! session down.

use uuid::Uuid;

use tandem_core::{FsTree, NodeSnapshot};

use crate::presence::Roster;
use crate::protocol::{RoomEvent, UserInfo};

/// The file tree and roster for one room, from one participant's view.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub tree: FsTree,
    pub roster: Roster,
}

impl RoomState {
    pub fn new(local_id: Uuid) -> Self {
        Self {
            tree: FsTree::new(),
            roster: Roster::new(local_id),
        }
    }

    /// Replace everything with an authoritative SYNC snapshot.
    pub fn seed(&mut self, tree: &NodeSnapshot, users: Vec<UserInfo>) {
        self.tree = FsTree::from_snapshot(tree);
        self.roster.seed(users);
    }

    /// Apply one remote event. Total: every failure path degrades to a
    /// logged no-op.
    pub fn apply(&mut self, sender: Uuid, event: &RoomEvent) {
        match event {
            // Lifecycle events are routed by the session/server, not here.
            RoomEvent::JoinRequest { .. } | RoomEvent::Sync { .. } => {
                log::debug!("ignoring lifecycle event {} in apply", event.kind());
            }

            RoomEvent::UserJoined { user } => self.roster.user_joined(user.clone()),
            RoomEvent::UserDisconnected { user_id } => self.roster.user_disconnected(*user_id),
            RoomEvent::TypingStart { cursor } => self.roster.typing_start(sender, *cursor),
            RoomEvent::TypingPause => self.roster.typing_pause(sender),

            RoomEvent::FileUpdated { file_id, content } => {
                if let Err(e) = self.tree.update_file_content(*file_id, content) {
                    log::trace!("file_updated for {file_id} dropped: {e}");
                }
            }
            RoomEvent::FileCreated {
                parent_id,
                file_id,
                name,
            } => {
                if let Err(e) = self.tree.create_file_with_id(*parent_id, *file_id, name) {
                    log::trace!("file_created {name} dropped: {e}");
                }
            }
            RoomEvent::FileRenamed { file_id, new_name } => {
                match self.tree.rename_file(*file_id, new_name) {
                    Ok(true) => {}
                    Ok(false) => log::trace!("file_renamed to {new_name} collided"),
                    Err(e) => log::trace!("file_renamed for {file_id} dropped: {e}"),
                }
            }
            RoomEvent::FileDeleted { file_id } => {
                if let Err(e) = self.tree.delete_file(*file_id) {
                    log::trace!("file_deleted for {file_id} dropped: {e}");
                }
            }
            RoomEvent::DirectoryCreated {
                parent_id,
                dir_id,
                name,
            } => {
                if let Err(e) = self.tree.create_directory_with_id(*parent_id, *dir_id, name) {
                    log::trace!("directory_created {name} dropped: {e}");
                }
            }
            RoomEvent::DirectoryRenamed { dir_id, new_name } => {
                match self.tree.rename_directory(*dir_id, new_name) {
                    Ok(true) => {}
                    Ok(false) => log::trace!("directory_renamed to {new_name} collided"),
                    Err(e) => log::trace!("directory_renamed for {dir_id} dropped: {e}"),
                }
            }
            RoomEvent::DirectoryDeleted { dir_id } => {
                if let Err(e) = self.tree.delete_directory(*dir_id) {
                    log::trace!("directory_deleted for {dir_id} dropped: {e}");
                }
            }
            RoomEvent::DirectoryUpdated { dir_id, children } => {
                if let Err(e) = self.tree.update_directory(*dir_id, children) {
                    log::trace!("directory_updated for {dir_id} dropped: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_state() -> (RoomState, Uuid) {
        let mut state = RoomState::new(Uuid::new_v4());
        let snapshot = NodeSnapshot::directory("root", vec![NodeSnapshot::file("index.js", "")]);
        state.seed(&snapshot, vec![]);
        let file_id = snapshot.children[0].id;
        (state, file_id)
    }

    #[test]
    fn test_seed_builds_tree_and_roster() {
        let local = Uuid::new_v4();
        let mut state = RoomState::new(local);
        let snapshot = NodeSnapshot::directory("root", vec![NodeSnapshot::file("index.js", "")]);
        let users = vec![UserInfo::new("bob")];
        state.seed(&snapshot, users);

        assert_eq!(state.tree.len(), 2);
        assert_eq!(state.roster.len(), 1);
    }

    #[test]
    fn test_apply_file_updated() {
        let (mut state, file_id) = seeded_state();
        let sender = Uuid::new_v4();

        state.apply(
            sender,
            &RoomEvent::FileUpdated {
                file_id,
                content: "hello".into(),
            },
        );
        assert_eq!(state.tree.node(file_id).unwrap().content, "hello");
    }

    #[test]
    fn test_apply_file_updated_twice_is_idempotent() {
        let (mut state, file_id) = seeded_state();
        let sender = Uuid::new_v4();
        let event = RoomEvent::FileUpdated {
            file_id,
            content: "same".into(),
        };

        state.apply(sender, &event);
        let after_once = state.tree.to_snapshot();
        state.apply(sender, &event);
        assert_eq!(state.tree.to_snapshot(), after_once);
    }

    #[test]
    fn test_apply_with_absent_ids_is_total() {
        let (mut state, _) = seeded_state();
        let sender = Uuid::new_v4();
        let ghost = Uuid::new_v4();
        let before = state.tree.to_snapshot();

        for event in [
            RoomEvent::FileUpdated {
                file_id: ghost,
                content: "x".into(),
            },
            RoomEvent::FileRenamed {
                file_id: ghost,
                new_name: "y".into(),
            },
            RoomEvent::FileDeleted { file_id: ghost },
            RoomEvent::DirectoryDeleted { dir_id: ghost },
            RoomEvent::DirectoryUpdated {
                dir_id: ghost,
                children: vec![],
            },
            RoomEvent::FileCreated {
                parent_id: ghost,
                file_id: Uuid::new_v4(),
                name: "z.txt".into(),
            },
        ] {
            state.apply(sender, &event);
        }
        assert_eq!(state.tree.to_snapshot(), before);
        assert!(state.tree.invariant_holds());
    }

    #[test]
    fn test_apply_remote_structure_uses_sender_minted_ids() {
        let (mut state, _) = seeded_state();
        let sender = Uuid::new_v4();
        let root = state.tree.root();
        let dir_id = Uuid::new_v4();
        let file_id = Uuid::new_v4();

        state.apply(
            sender,
            &RoomEvent::DirectoryCreated {
                parent_id: root,
                dir_id,
                name: "src".into(),
            },
        );
        state.apply(
            sender,
            &RoomEvent::FileCreated {
                parent_id: dir_id,
                file_id,
                name: "main.rs".into(),
            },
        );

        assert!(state.tree.contains(dir_id));
        assert_eq!(state.tree.node(file_id).unwrap().parent, Some(dir_id));
    }

    #[test]
    fn test_apply_presence_events() {
        let (mut state, _) = seeded_state();
        let bob = UserInfo::new("bob");

        state.apply(bob.id, &RoomEvent::UserJoined { user: bob.clone() });
        state.apply(bob.id, &RoomEvent::TypingStart { cursor: Some(9) });
        assert!(state.roster.get(bob.id).unwrap().typing);

        state.apply(bob.id, &RoomEvent::TypingPause);
        assert!(!state.roster.get(bob.id).unwrap().typing);

        state.apply(bob.id, &RoomEvent::UserDisconnected { user_id: bob.id });
        assert!(state.roster.is_empty());
    }

    #[test]
    fn test_lifecycle_events_are_ignored_by_apply() {
        let (mut state, _) = seeded_state();
        let before = state.tree.to_snapshot();

        state.apply(
            Uuid::new_v4(),
            &RoomEvent::Sync {
                tree: NodeSnapshot::directory("other", vec![]),
                users: vec![],
            },
        );
        state.apply(
            Uuid::new_v4(),
            &RoomEvent::JoinRequest {
                username: "x".into(),
                room_id: "yyyyy".into(),
            },
        );
        assert_eq!(state.tree.to_snapshot(), before);
    }
}
