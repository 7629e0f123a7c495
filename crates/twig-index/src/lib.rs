//! Pending change set for Twig.
//!
//! Records the sparse edits a caller wants applied to the next commit: file
//! writes and deletions keyed by normalized repository path. Nothing here
//! touches the object store; the patch engine consumes a [`ChangeSet`]
//! directory by directory.
//!
//! # Key Types
//!
//! - [`RepoPath`] -- normalized absolute path (`/a/b/c`)
//! - [`ChangeSet`] -- the staging area (BTreeMap-backed)
//! - [`PendingChange`] -- write or delete at one path
//! - [`Tombstone`] -- whether a deletion was observed in the base tree
//! - [`DirectoryChanges`] -- the changes affecting one directory level
//! - [`ChangeSummary`] -- grouped view for status reporting

pub mod changes;
pub mod error;
pub mod path;
pub mod status;

pub use changes::{ChangeSet, DirectoryChanges, PendingChange, Tombstone};
pub use error::{IndexError, IndexResult};
pub use path::RepoPath;
pub use status::ChangeSummary;
