use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a file-system node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Directory,
}

/// A single node in the arena-backed file tree.
///
/// Parent/child links are by id, so lookup never re-walks the tree and
/// subtrees carry no ownership cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsNode {
    pub id: Uuid,
    pub name: String,
    pub kind: NodeKind,

    /// File body. Always empty for directories.
    pub content: String,

    /// Child ids in display order. Always empty for files.
    pub children: Vec<Uuid>,
    pub parent: Option<Uuid>,

    /// UI expansion flag. Purely local, never synchronized.
    #[serde(skip)]
    pub is_open: bool,
}

impl FsNode {
    pub fn file(id: Uuid, name: impl Into<String>, parent: Uuid) -> Self {
        Self {
            id,
            name: name.into(),
            kind: NodeKind::File,
            content: String::new(),
            children: Vec::new(),
            parent: Some(parent),
            is_open: false,
        }
    }

    pub fn directory(id: Uuid, name: impl Into<String>, parent: Option<Uuid>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: NodeKind::Directory,
            content: String::new(),
            children: Vec::new(),
            parent,
            is_open: false,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// Nested snapshot of a node and its subtree.
///
/// This is the wire form: the SYNC event carries the whole room tree as
/// one root snapshot, and wholesale directory replacement carries a list
/// of child snapshots. Ids are preserved so every participant addresses
/// the same node by the same identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: Uuid,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// New file snapshot with a freshly generated id.
    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: NodeKind::File,
            content: content.into(),
            children: Vec::new(),
        }
    }

    /// New directory snapshot with a freshly generated id.
    pub fn directory(name: impl Into<String>, children: Vec<NodeSnapshot>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: NodeKind::Directory,
            content: String::new(),
            children,
        }
    }

    /// Total node count of this subtree, including self.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_node_shape() {
        let parent = Uuid::new_v4();
        let node = FsNode::file(Uuid::new_v4(), "main.rs", parent);
        assert!(node.is_file());
        assert!(!node.is_directory());
        assert!(node.children.is_empty());
        assert_eq!(node.parent, Some(parent));
        assert!(node.content.is_empty());
    }

    #[test]
    fn test_directory_node_shape() {
        let node = FsNode::directory(Uuid::new_v4(), "src", None);
        assert!(node.is_directory());
        assert!(node.parent.is_none());
        assert!(!node.is_open);
    }

    #[test]
    fn test_snapshot_node_count() {
        let snap = NodeSnapshot::directory(
            "root",
            vec![
                NodeSnapshot::file("a.txt", ""),
                NodeSnapshot::directory("sub", vec![NodeSnapshot::file("b.txt", "hi")]),
            ],
        );
        assert_eq!(snap.node_count(), 4);
    }

    #[test]
    fn test_is_open_not_serialized() {
        let mut node = FsNode::directory(Uuid::new_v4(), "src", None);
        node.is_open = true;

        let json = serde_json::to_string(&node).unwrap();
        let back: FsNode = serde_json::from_str(&json).unwrap();
        // Expansion state is local-only and resets on the wire.
        assert!(!back.is_open);
    }
}
