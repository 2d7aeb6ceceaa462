//! Arena-backed file-system tree.
//!
//! The room tree is a flat arena of nodes keyed by id, with parent/child
//! links stored as ids. Lookup is O(1) and structural operations touch
//! only the nodes involved. Every operation preserves the tree invariant:
//! one root, every other node reachable by exactly one path, sibling names
//! unique within a directory, files childless.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::FsError;
use crate::node::{FsNode, NodeKind, NodeSnapshot};

/// Default name of the root directory of a fresh room.
pub const ROOT_NAME: &str = "root";

/// The shared file-system tree for one room.
#[derive(Debug, Clone)]
pub struct FsTree {
    nodes: HashMap<Uuid, FsNode>,
    root: Uuid,
}

impl FsTree {
    /// Empty tree: a single root directory, expanded.
    pub fn new() -> Self {
        let root = Uuid::new_v4();
        let mut node = FsNode::directory(root, ROOT_NAME, None);
        node.is_open = true;
        let mut nodes = HashMap::new();
        nodes.insert(root, node);
        Self { nodes, root }
    }

    /// Rebuild a tree from a full snapshot (the SYNC payload).
    ///
    /// This is total: a malformed snapshot with colliding sibling names is
    /// repaired by dropping the later duplicates rather than rejected, so a
    /// bad remote snapshot can never take the session down.
    pub fn from_snapshot(snapshot: &NodeSnapshot) -> Self {
        let mut root_node = FsNode::directory(snapshot.id, snapshot.name.clone(), None);
        root_node.is_open = true;
        let mut tree = Self {
            nodes: HashMap::from([(snapshot.id, root_node)]),
            root: snapshot.id,
        };
        for child in &snapshot.children {
            tree.insert_snapshot(child, snapshot.id);
        }
        tree
    }

    pub fn root(&self) -> Uuid {
        self.root
    }

    pub fn node(&self, id: Uuid) -> Option<&FsNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Total node count, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false // there is always a root
    }

    /// Child id with the given name, if any.
    pub fn child_by_name(&self, parent: Uuid, name: &str) -> Option<Uuid> {
        let dir = self.nodes.get(&parent)?;
        dir.children
            .iter()
            .copied()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    // ── Creation ────────────────────────────────────────────────────

    /// Create a file as the last child of `parent`, generating its id.
    pub fn create_file(&mut self, parent: Uuid, name: &str) -> Result<Uuid, FsError> {
        self.create_file_with_id(parent, Uuid::new_v4(), name)
    }

    /// Create a file with a caller-supplied id (remote creations carry the
    /// id generated at the originating participant).
    pub fn create_file_with_id(
        &mut self,
        parent: Uuid,
        id: Uuid,
        name: &str,
    ) -> Result<Uuid, FsError> {
        self.check_insert(parent, id, name)?;
        self.nodes.insert(id, FsNode::file(id, name, parent));
        self.attach(parent, id);
        Ok(id)
    }

    /// Create a directory as the last child of `parent`, generating its id.
    pub fn create_directory(&mut self, parent: Uuid, name: &str) -> Result<Uuid, FsError> {
        self.create_directory_with_id(parent, Uuid::new_v4(), name)
    }

    /// Create a directory with a caller-supplied id.
    pub fn create_directory_with_id(
        &mut self,
        parent: Uuid,
        id: Uuid,
        name: &str,
    ) -> Result<Uuid, FsError> {
        self.check_insert(parent, id, name)?;
        self.nodes.insert(id, FsNode::directory(id, name, Some(parent)));
        self.attach(parent, id);
        Ok(id)
    }

    // ── Rename ──────────────────────────────────────────────────────

    /// Rename a file. `Ok(false)` on sibling-name collision (the tree is
    /// left unchanged), so callers can show inline feedback without
    /// interrupting the editing flow.
    pub fn rename_file(&mut self, id: Uuid, new_name: &str) -> Result<bool, FsError> {
        self.rename(id, new_name, NodeKind::File)
    }

    /// Rename a directory. Same collision contract as [`rename_file`].
    ///
    /// [`rename_file`]: FsTree::rename_file
    pub fn rename_directory(&mut self, id: Uuid, new_name: &str) -> Result<bool, FsError> {
        self.rename(id, new_name, NodeKind::Directory)
    }

    fn rename(&mut self, id: Uuid, new_name: &str, kind: NodeKind) -> Result<bool, FsError> {
        let node = self.nodes.get(&id).ok_or(FsError::NotFound)?;
        if node.kind != kind {
            return Err(match kind {
                NodeKind::File => FsError::NotAFile,
                NodeKind::Directory => FsError::NotADirectory,
            });
        }
        if new_name.is_empty() {
            return Ok(false);
        }
        if let Some(parent) = node.parent {
            if let Some(existing) = self.child_by_name(parent, new_name) {
                return Ok(existing == id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.name = new_name.to_string();
        }
        Ok(true)
    }

    // ── Deletion ────────────────────────────────────────────────────

    /// Delete a file. Returns the removed id for caller-side cleanup of
    /// open-file references.
    pub fn delete_file(&mut self, id: Uuid) -> Result<Uuid, FsError> {
        let node = self.nodes.get(&id).ok_or(FsError::NotFound)?;
        if !node.is_file() {
            return Err(FsError::NotAFile);
        }
        self.detach(id);
        self.nodes.remove(&id);
        Ok(id)
    }

    /// Delete a directory and its entire subtree. Returns all removed ids;
    /// the editing context is not auto-healed here — callers prune their
    /// own references against the returned set.
    pub fn delete_directory(&mut self, id: Uuid) -> Result<Vec<Uuid>, FsError> {
        let node = self.nodes.get(&id).ok_or(FsError::NotFound)?;
        if !node.is_directory() {
            return Err(FsError::NotADirectory);
        }
        if id == self.root {
            return Err(FsError::RootImmutable);
        }
        self.detach(id);
        let removed = self.collect_subtree(id);
        for rid in &removed {
            self.nodes.remove(rid);
        }
        Ok(removed)
    }

    // ── Content & structure updates ─────────────────────────────────

    /// Replace a file's content wholesale.
    ///
    /// This is the single entry point for both local keystrokes and remote
    /// FILE_UPDATED application. It is idempotent; concurrent writers
    /// converge to whichever update a given participant processes last
    /// (documented last-write-wins race, no merge).
    pub fn update_file_content(&mut self, id: Uuid, content: &str) -> Result<(), FsError> {
        let node = self.nodes.get_mut(&id).ok_or(FsError::NotFound)?;
        if !node.is_file() {
            return Err(FsError::NotAFile);
        }
        node.content = content.to_string();
        Ok(())
    }

    /// Replace a directory's child list wholesale from snapshots.
    ///
    /// Used when applying a remote structural snapshot (batch operation or
    /// restore), not for single-field edits. The previous subtrees are
    /// discarded from the arena.
    pub fn update_directory(
        &mut self,
        id: Uuid,
        children: &[NodeSnapshot],
    ) -> Result<(), FsError> {
        let node = self.nodes.get(&id).ok_or(FsError::NotFound)?;
        if !node.is_directory() {
            return Err(FsError::NotADirectory);
        }

        let old_children = node.children.clone();
        for child in old_children {
            for rid in self.collect_subtree(child) {
                self.nodes.remove(&rid);
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children.clear();
        }
        for child in children {
            self.insert_snapshot(child, id);
        }
        Ok(())
    }

    // ── Local-only expansion state ──────────────────────────────────

    /// Toggle a directory's UI expansion flag. Returns the new state.
    pub fn toggle_directory(&mut self, id: Uuid) -> Result<bool, FsError> {
        let node = self.nodes.get_mut(&id).ok_or(FsError::NotFound)?;
        if !node.is_directory() {
            return Err(FsError::NotADirectory);
        }
        node.is_open = !node.is_open;
        Ok(node.is_open)
    }

    /// Collapse every directory except the root.
    pub fn collapse_directories(&mut self) {
        let root = self.root;
        for node in self.nodes.values_mut() {
            if node.is_directory() && node.id != root {
                node.is_open = false;
            }
        }
    }

    // ── Snapshots ───────────────────────────────────────────────────

    /// Full-tree snapshot (the SYNC payload).
    pub fn to_snapshot(&self) -> NodeSnapshot {
        self.snapshot_of(self.root)
            .unwrap_or_else(|| NodeSnapshot::directory(ROOT_NAME, Vec::new()))
    }

    /// Snapshot of one subtree.
    pub fn snapshot_of(&self, id: Uuid) -> Option<NodeSnapshot> {
        let node = self.nodes.get(&id)?;
        Some(NodeSnapshot {
            id: node.id,
            name: node.name.clone(),
            kind: node.kind,
            content: node.content.clone(),
            children: node
                .children
                .iter()
                .filter_map(|c| self.snapshot_of(*c))
                .collect(),
        })
    }

    /// Path of a node relative to the root, components joined with `/`.
    pub fn path_of(&self, id: Uuid) -> Option<String> {
        let mut parts = Vec::new();
        let mut cursor = self.nodes.get(&id)?;
        loop {
            match cursor.parent {
                Some(parent) => {
                    parts.push(cursor.name.as_str());
                    cursor = self.nodes.get(&parent)?;
                }
                None => break,
            }
        }
        parts.reverse();
        Some(parts.join("/"))
    }

    /// Ids of a subtree in depth-first order, `id` first.
    pub fn collect_subtree(&self, id: Uuid) -> Vec<Uuid> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                out.push(next);
                stack.extend(node.children.iter().copied());
            }
        }
        out
    }

    // ── Internal ────────────────────────────────────────────────────

    fn check_insert(&self, parent: Uuid, id: Uuid, name: &str) -> Result<(), FsError> {
        let dir = self.nodes.get(&parent).ok_or(FsError::InvalidParent)?;
        if !dir.is_directory() {
            return Err(FsError::InvalidParent);
        }
        if self.nodes.contains_key(&id) {
            return Err(FsError::IdInUse);
        }
        if name.is_empty() || self.child_by_name(parent, name).is_some() {
            return Err(FsError::NameConflict);
        }
        Ok(())
    }

    fn attach(&mut self, parent: Uuid, id: Uuid) {
        if let Some(dir) = self.nodes.get_mut(&parent) {
            dir.children.push(id);
        }
    }

    fn detach(&mut self, id: Uuid) {
        let parent = self.nodes.get(&id).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(dir) = self.nodes.get_mut(&parent) {
                dir.children.retain(|c| *c != id);
            }
        }
    }

    fn insert_snapshot(&mut self, snapshot: &NodeSnapshot, parent: Uuid) {
        if self.child_by_name(parent, &snapshot.name).is_some()
            || self.nodes.contains_key(&snapshot.id)
        {
            log::warn!(
                "dropping snapshot node {} ({:?}): sibling name or id collision",
                snapshot.name,
                snapshot.id
            );
            return;
        }
        let node = match snapshot.kind {
            NodeKind::File => {
                let mut f = FsNode::file(snapshot.id, snapshot.name.clone(), parent);
                f.content = snapshot.content.clone();
                f
            }
            NodeKind::Directory => {
                FsNode::directory(snapshot.id, snapshot.name.clone(), Some(parent))
            }
        };
        let is_dir = node.is_directory();
        self.nodes.insert(snapshot.id, node);
        self.attach(parent, snapshot.id);
        if is_dir {
            for child in &snapshot.children {
                self.insert_snapshot(child, snapshot.id);
            }
        }
    }

    /// Verify the structural invariant. Test support; O(n).
    #[doc(hidden)]
    pub fn invariant_holds(&self) -> bool {
        // Root has no parent, everything else has exactly one.
        let Some(root) = self.nodes.get(&self.root) else {
            return false;
        };
        if root.parent.is_some() {
            return false;
        }
        // Every node reachable from the root exactly once.
        let reachable = self.collect_subtree(self.root);
        if reachable.len() != self.nodes.len() {
            return false;
        }
        for node in self.nodes.values() {
            if node.is_file() && !node.children.is_empty() {
                return false;
            }
            let mut seen = std::collections::HashSet::new();
            for child in &node.children {
                let Some(c) = self.nodes.get(child) else {
                    return false;
                };
                if c.parent != Some(node.id) || !seen.insert(c.name.as_str()) {
                    return false;
                }
            }
        }
        true
    }
}

impl Default for FsTree {
    fn default() -> Self {
        Self::new()
    }
}
