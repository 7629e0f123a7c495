//! Error types for tree patching and commit construction.

use twig_index::IndexError;
use twig_store::StoreError;
use twig_types::{ObjectId, TypeError};

/// Errors that can occur while patching a tree or building a commit.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// A base tree (or one of its subtrees) is not in the store.
    #[error("base tree not found: {0}")]
    BaseNotFound(ObjectId),

    /// A commit was built without an author.
    #[error("commit has no author")]
    MissingAuthor,

    /// Author or committer cannot be written on a signature line.
    #[error("invalid identity: {0}")]
    Identity(#[from] TypeError),

    /// A path could not be formed from a tree entry name.
    #[error(transparent)]
    Path(#[from] IndexError),

    /// The object store failed to read or write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for patch results.
pub type PatchResult<T> = Result<T, PatchError>;
