//! Sparse tree patching for Twig.
//!
//! [`TreePatcher`] merges a [`twig_index::ChangeSet`] into an existing tree
//! and produces a new tree that differs from the base only along the paths
//! that were touched. Subtrees with no pending changes are carried over by
//! id; they are neither read nor re-hashed, so the cost of a patch scales
//! with the number of changed paths rather than the size of the tree.
//!
//! [`build_commit`] and [`CommitBuilder`] wrap the resulting tree in a
//! commit object.

pub mod commit;
pub mod engine;
pub mod error;

pub use commit::{build_commit, CommitBuilder};
pub use engine::{PatchOptions, PatchOutcome, PatchStats, TreePatcher};
pub use error::{PatchError, PatchResult};
