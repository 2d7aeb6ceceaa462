//! Per-participant editing context.
//!
//! The open-file list and active file are a local view into the shared
//! tree — pointers by id, never ownership. They are never broadcast; only
//! content and structural deltas on the underlying tree are.

use uuid::Uuid;

use crate::tree::FsTree;

/// Open-file list plus active-file pointer for the local participant.
#[derive(Debug, Clone, Default)]
pub struct EditContext {
    open: Vec<Uuid>,
    active: Option<Uuid>,
}

impl EditContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file and make it active. Re-opening moves focus only.
    pub fn open_file(&mut self, id: Uuid) {
        if !self.open.contains(&id) {
            self.open.push(id);
        }
        self.active = Some(id);
    }

    /// Close a file. If it was active, focus falls back to the most
    /// recently opened remaining file.
    pub fn close_file(&mut self, id: Uuid) {
        self.open.retain(|f| *f != id);
        if self.active == Some(id) {
            self.active = self.open.last().copied();
        }
    }

    /// Move focus to an already-known file id.
    pub fn set_active(&mut self, id: Uuid) {
        if !self.open.contains(&id) {
            self.open.push(id);
        }
        self.active = Some(id);
    }

    pub fn active(&self) -> Option<Uuid> {
        self.active
    }

    pub fn open_files(&self) -> &[Uuid] {
        &self.open
    }

    /// Drop references to files that no longer exist in the tree.
    ///
    /// Deletions do not auto-heal this context; the session calls this
    /// after applying any structural removal.
    pub fn prune(&mut self, tree: &FsTree) {
        self.open.retain(|id| tree.contains(*id));
        if let Some(active) = self.active {
            if !tree.contains(active) {
                self.active = self.open.last().copied();
            }
        }
    }

    /// Forget everything (session reset / re-SYNC).
    pub fn clear(&mut self) {
        self.open.clear();
        self.active = None;
    }
}
