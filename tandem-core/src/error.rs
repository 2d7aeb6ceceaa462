//! File-system operation errors.
//!
//! These are returned to callers as values and never cross the
//! synchronization boundary — a remote event referencing a bad id is
//! applied as a no-op, not a crash.

/// Errors from file-system tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// The referenced id is not present in the tree.
    NotFound,
    /// The referenced parent is missing or not a directory.
    InvalidParent,
    /// A sibling with the same name already exists.
    NameConflict,
    /// The caller-supplied id already names a node in the tree.
    IdInUse,
    /// The operation requires a file but the id names a directory.
    NotAFile,
    /// The operation requires a directory but the id names a file.
    NotADirectory,
    /// The root directory cannot be deleted or renamed away.
    RootImmutable,
}

impl std::fmt::Display for FsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "node not found"),
            Self::InvalidParent => write!(f, "parent is missing or not a directory"),
            Self::NameConflict => write!(f, "a sibling with that name already exists"),
            Self::IdInUse => write!(f, "that id already names a node"),
            Self::NotAFile => write!(f, "node is not a file"),
            Self::NotADirectory => write!(f, "node is not a directory"),
            Self::RootImmutable => write!(f, "the root directory cannot be removed"),
        }
    }
}

impl std::error::Error for FsError {}
