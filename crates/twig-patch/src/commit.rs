//! Commit construction.

use tracing::debug;
use twig_store::{Commit, ObjectStore};
use twig_types::{Identity, ObjectId};

use crate::error::{PatchError, PatchResult};

/// Wrap `tree` in a commit object and insert it.
///
/// Pure construction plus one store write; a store failure is returned as
/// is and never retried.
pub fn build_commit(
    store: &dyn ObjectStore,
    tree: ObjectId,
    parent: Option<ObjectId>,
    author: &Identity,
    committer: &Identity,
    message: &str,
) -> PatchResult<ObjectId> {
    CommitBuilder::new(tree)
        .with_parent(parent)
        .with_author(author.clone())
        .with_committer(committer.clone())
        .with_message(message)
        .write(store)
}

/// Builder for commit objects. The committer defaults to the author.
#[derive(Clone, Debug)]
pub struct CommitBuilder {
    tree: ObjectId,
    parent: Option<ObjectId>,
    author: Option<Identity>,
    committer: Option<Identity>,
    message: String,
}

impl CommitBuilder {
    pub fn new(tree: ObjectId) -> Self {
        Self {
            tree,
            parent: None,
            author: None,
            committer: None,
            message: String::new(),
        }
    }

    /// Set the parent commit. `None` makes a root commit.
    pub fn with_parent(mut self, parent: Option<ObjectId>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_author(mut self, author: Identity) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_committer(mut self, committer: Identity) -> Self {
        self.committer = Some(committer);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Validate and assemble the commit without storing it.
    pub fn build(self) -> PatchResult<Commit> {
        let author = self.author.ok_or(PatchError::MissingAuthor)?;
        let committer = self.committer.unwrap_or_else(|| author.clone());
        author.validate()?;
        committer.validate()?;
        Ok(Commit {
            tree: self.tree,
            parents: self.parent.into_iter().collect(),
            author,
            committer,
            message: self.message,
        })
    }

    /// Build the commit and insert it into `store`.
    pub fn write(self, store: &dyn ObjectStore) -> PatchResult<ObjectId> {
        let commit = self.build()?;
        let id = store.insert_commit(&commit)?;
        debug!(
            commit = %id.short_hex(),
            tree = %commit.tree.short_hex(),
            parent = ?commit.parent().map(|p| p.short_hex()),
            "wrote commit"
        );
        Ok(id)
    }
}
