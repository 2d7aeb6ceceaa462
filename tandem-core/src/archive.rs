//! Local export of the room tree.
//!
//! Pure functions of current tree state — no network interaction. The
//! packed entries are what a host shell writes to disk or zips up for the
//! "download workspace" affordance.

use serde::{Deserialize, Serialize};

use crate::node::NodeKind;
use crate::tree::FsTree;

/// One exported node: its path relative to the root and, for files, the
/// full content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub path: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Flatten the tree into archive entries, directories before their
/// contents, siblings in display order. The root itself is omitted.
pub fn pack_tree(tree: &FsTree) -> Vec<ArchiveEntry> {
    let mut entries = Vec::with_capacity(tree.len().saturating_sub(1));
    pack_children(tree, tree.root(), &mut entries);
    entries
}

fn pack_children(tree: &FsTree, dir: uuid::Uuid, out: &mut Vec<ArchiveEntry>) {
    let Some(node) = tree.node(dir) else { return };
    for child_id in &node.children {
        let Some(child) = tree.node(*child_id) else {
            continue;
        };
        let Some(path) = tree.path_of(*child_id) else {
            continue;
        };
        match child.kind {
            NodeKind::File => out.push(ArchiveEntry {
                path,
                kind: NodeKind::File,
                content: Some(child.content.clone()),
            }),
            NodeKind::Directory => {
                out.push(ArchiveEntry {
                    path,
                    kind: NodeKind::Directory,
                    content: None,
                });
                pack_children(tree, *child_id, out);
            }
        }
    }
}

/// JSON manifest of the whole tree (pretty-printed snapshot).
pub fn manifest_json(tree: &FsTree) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&tree.to_snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> FsTree {
        let mut tree = FsTree::new();
        let root = tree.root();
        let src = tree.create_directory(root, "src").unwrap();
        let main = tree.create_file(src, "main.rs").unwrap();
        tree.update_file_content(main, "fn main() {}").unwrap();
        tree.create_file(root, "README.md").unwrap();
        tree
    }

    #[test]
    fn test_pack_tree_paths_and_order() {
        let entries = pack_tree(&sample_tree());
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["src", "src/main.rs", "README.md"]);
    }

    #[test]
    fn test_pack_tree_file_content() {
        let entries = pack_tree(&sample_tree());
        let main = entries.iter().find(|e| e.path == "src/main.rs").unwrap();
        assert_eq!(main.kind, NodeKind::File);
        assert_eq!(main.content.as_deref(), Some("fn main() {}"));

        let dir = entries.iter().find(|e| e.path == "src").unwrap();
        assert_eq!(dir.kind, NodeKind::Directory);
        assert!(dir.content.is_none());
    }

    #[test]
    fn test_pack_is_pure() {
        let tree = sample_tree();
        assert_eq!(pack_tree(&tree), pack_tree(&tree));
    }

    #[test]
    fn test_manifest_json_parses_back() {
        let tree = sample_tree();
        let json = manifest_json(&tree).unwrap();
        let snap: crate::node::NodeSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap.node_count(), tree.len());
    }
}
