//! Inputs and outputs of [`crate::Repository::commit`].

use twig_index::{ChangeSet, RepoPath};
use twig_refs::UpdateOutcome;
use twig_types::{Identity, ObjectId};

/// Optional overrides for a commit.
#[derive(Clone, Debug, Default)]
pub struct CommitOptions {
    /// Committer identity. Defaults to the author.
    pub committer: Option<Identity>,
    /// Branch (short name or full `refs/...` name) to commit onto. Defaults
    /// to the branch HEAD points at.
    pub parent_ref: Option<String>,
    /// Tree to patch instead of the parent commit's tree.
    pub base_tree: Option<ObjectId>,
}

impl CommitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_committer(mut self, committer: Identity) -> Self {
        self.committer = Some(committer);
        self
    }

    pub fn with_parent_ref(mut self, name: impl Into<String>) -> Self {
        self.parent_ref = Some(name.into());
        self
    }

    pub fn with_base_tree(mut self, tree: ObjectId) -> Self {
        self.base_tree = Some(tree);
        self
    }
}

/// A commit written to the store but not yet published on its branch.
///
/// Produced by [`crate::Repository::prepare_commit`]; nothing references
/// the commit until [`crate::Repository::publish`] moves the branch.
#[derive(Clone, Debug)]
pub struct PreparedCommit {
    /// Full name of the ref to move.
    pub ref_name: String,
    pub commit: ObjectId,
    pub tree: ObjectId,
    /// Value the ref held when the commit was prepared; the publish
    /// compares against it.
    pub parent: Option<ObjectId>,
    /// Deletions that removed an entry from the base tree.
    pub applied_deletions: Vec<RepoPath>,
    /// The staged changes this commit was built from.
    pub changes: ChangeSet,
}

/// Outcome of a published commit.
#[derive(Clone, Debug)]
pub struct CommitResult {
    pub commit: ObjectId,
    pub tree: ObjectId,
    pub parent: Option<ObjectId>,
    pub ref_update: UpdateOutcome,
    /// The published changes, with the tombstones of applied deletions
    /// flipped to [`twig_index::Tombstone::Applied`].
    pub changes: ChangeSet,
}

impl CommitResult {
    /// Paths whose deletion removed something from the base tree.
    pub fn deleted(&self) -> impl Iterator<Item = &RepoPath> {
        self.changes
            .deletions()
            .filter(|(_, state)| *state == twig_index::Tombstone::Applied)
            .map(|(path, _)| path)
    }
}
