//! High-level SDK for Twig.
//!
//! [`Repository`] is the entry point for applications embedding Twig: stage
//! sparse writes and deletions with [`Repository::add`] and
//! [`Repository::delete`], then turn them into a commit on a branch with
//! [`Repository::commit`].
//!
//! A commit happens in two phases. [`Repository::prepare_commit`] patches
//! the staged changes into the branch's tree and writes the commit object;
//! [`Repository::publish`] moves the branch with a compare-and-swap and
//! fails with [`SdkError::RefConflict`] if another writer moved it first.

pub mod commit;
pub mod config;
pub mod error;
pub mod repository;

pub use commit::{CommitOptions, CommitResult, PreparedCommit};
pub use config::RepoConfig;
pub use error::{SdkError, SdkResult};
pub use repository::Repository;

// Re-export key types
pub use twig_index::{ChangeSet, PendingChange, RepoPath, Tombstone};
pub use twig_patch::{PatchOptions, PatchStats};
pub use twig_refs::{FileRefStore, InMemoryRefStore, RefStore, UpdateOutcome};
pub use twig_store::{Blob, Commit, EntryMode, InMemoryObjectStore, ObjectStore, Tree, TreeEntry};
pub use twig_types::{Identity, ObjectId};
