//! # tandem-core — shared file-system model for Tandem
//!
//! The in-memory document store every room participant holds a copy of:
//! an arena-backed tree of files and directories with stable ids, plus the
//! local-only editing context (open files, active file) layered on top.
//!
//! ## Modules
//!
//! - [`node`] — arena node and the nested snapshot wire form
//! - [`tree`] — [`FsTree`]: id-keyed arena with CRUD + snapshot round-trip
//! - [`editing`] — per-participant open-file list and active file
//! - [`archive`] — pure local export (path/content entries, JSON manifest)
//! - [`error`] — [`FsError`], returned as values and never thrown across
//!   the synchronization boundary

pub mod archive;
pub mod editing;
pub mod error;
pub mod node;
pub mod tree;

pub use archive::{manifest_json, pack_tree, ArchiveEntry};
pub use editing::EditContext;
pub use error::FsError;
pub use node::{FsNode, NodeKind, NodeSnapshot};
pub use tree::{FsTree, ROOT_NAME};
