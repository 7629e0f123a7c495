use std::sync::Arc;

use tracing::{debug, info};
use twig_index::{ChangeSet, RepoPath};
use twig_patch::{build_commit, TreePatcher};
use twig_refs::{branch_ref_name, validate_branch_name, BranchInfo, InMemoryRefStore, RefStore};
use twig_store::{InMemoryObjectStore, ObjectStore, StoreError};
use twig_types::{Identity, ObjectId};

use crate::commit::{CommitOptions, CommitResult, PreparedCommit};
use crate::config::RepoConfig;
use crate::error::{SdkError, SdkResult};

/// High-level Twig repository API.
///
/// Holds the staged changes for the next commit. The object store and ref
/// store are shared: several `Repository` values over the same stores
/// behave like independent writers of one repository.
pub struct Repository {
    store: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    config: RepoConfig,
    changes: ChangeSet,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("config", &self.config)
            .field("pending", &self.changes.len())
            .finish()
    }
}

impl Repository {
    /// Open a repository over existing stores.
    pub fn new(store: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>, config: RepoConfig) -> Self {
        Self {
            store,
            refs,
            config,
            changes: ChangeSet::new(),
        }
    }

    /// Open a repository and point an unset HEAD at the default branch.
    pub fn init(
        store: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        config: RepoConfig,
    ) -> SdkResult<Self> {
        if refs.head()?.is_none() {
            refs.set_head(&config.default_branch)?;
            debug!(branch = %config.default_branch, "initialized HEAD");
        }
        Ok(Self::new(store, refs, config))
    }

    /// A fresh repository backed by in-memory stores.
    pub fn in_memory() -> SdkResult<Self> {
        Self::init(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
            RepoConfig::default(),
        )
    }

    // ---- Staging ----

    /// Stage `content` to be written at `path`.
    pub fn add(&mut self, path: &str, content: impl Into<Vec<u8>>) -> SdkResult<RepoPath> {
        Ok(self.changes.add(path, content)?)
    }

    /// Stage the removal of whatever exists at `path`.
    pub fn delete(&mut self, path: &str) -> SdkResult<RepoPath> {
        Ok(self.changes.delete(path)?)
    }

    /// The staged changes.
    pub fn pending(&self) -> &ChangeSet {
        &self.changes
    }

    /// Drop every staged change.
    pub fn reset(&mut self) {
        self.changes.clear();
    }

    // ---- Commit ----

    /// Patch the staged changes into the branch's tree and write a commit,
    /// without moving the branch.
    ///
    /// The staged changes are left untouched.
    pub fn prepare_commit(
        &self,
        message: &str,
        author: &Identity,
        options: CommitOptions,
    ) -> SdkResult<PreparedCommit> {
        let ref_name = match options.parent_ref.as_deref() {
            Some(name) => full_ref_name(name)?,
            None => branch_ref_name(&self.current_branch()?),
        };
        let parent = self.refs.resolve_ref(&ref_name)?;
        let base_tree = match (options.base_tree, parent) {
            (Some(tree), _) => Some(tree),
            (None, Some(parent)) => Some(self.parent_tree(parent)?),
            (None, None) => None,
        };

        let patcher =
            TreePatcher::new(Arc::clone(&self.store)).with_options(self.config.patch_options());
        let outcome = patcher.patch_root(base_tree, &self.changes)?;
        if base_tree == Some(outcome.tree) && !self.config.allow_empty_commits {
            return Err(SdkError::NothingToCommit { tree: outcome.tree });
        }

        let committer = options.committer.as_ref().unwrap_or(author);
        let commit = build_commit(
            self.store.as_ref(),
            outcome.tree,
            parent,
            author,
            committer,
            message,
        )?;
        debug!(
            ref_name = %ref_name,
            commit = %commit.short_hex(),
            stats = ?outcome.stats,
            "prepared commit"
        );

        Ok(PreparedCommit {
            ref_name,
            commit,
            tree: outcome.tree,
            parent,
            applied_deletions: outcome.applied_deletions,
            changes: self.changes.clone(),
        })
    }

    /// The tree of `parent`. A branch pointing at a commit the store does
    /// not hold is [`SdkError::BaseNotFound`].
    fn parent_tree(&self, parent: ObjectId) -> SdkResult<ObjectId> {
        match self.store.read_commit(&parent) {
            Ok(commit) => Ok(commit.tree),
            Err(StoreError::NotFound(_)) => Err(SdkError::BaseNotFound(parent)),
            Err(e) => Err(e.into()),
        }
    }

    /// Move the commit's branch from its recorded parent to the commit.
    ///
    /// On success the published changes leave the staging area; changes
    /// staged after [`Repository::prepare_commit`] stay. On a conflict the
    /// branch and the staging area are untouched.
    pub fn publish(&mut self, prepared: PreparedCommit) -> SdkResult<CommitResult> {
        let PreparedCommit {
            ref_name,
            commit,
            tree,
            parent,
            applied_deletions,
            mut changes,
        } = prepared;

        let ref_update = self
            .refs
            .update_ref(&ref_name, parent, commit)
            .map_err(|source| SdkError::RefConflict { commit, source })?;

        for (path, change) in changes.iter() {
            if self.changes.get(path) == Some(change) {
                self.changes.remove(path);
            }
        }
        for path in &applied_deletions {
            changes.mark_applied(path);
        }

        info!(
            ref_name = %ref_name,
            commit = %commit.short_hex(),
            tree = %tree.short_hex(),
            deleted = applied_deletions.len(),
            "published commit"
        );
        Ok(CommitResult {
            commit,
            tree,
            parent,
            ref_update,
            changes,
        })
    }

    /// Commit the staged changes and publish the commit.
    pub fn commit(
        &mut self,
        message: &str,
        author: &Identity,
        options: CommitOptions,
    ) -> SdkResult<CommitResult> {
        let prepared = self.prepare_commit(message, author, options)?;
        self.publish(prepared)
    }

    // ---- Branches ----

    /// Name of the branch HEAD points at, or the default branch when HEAD
    /// is unset.
    pub fn current_branch(&self) -> SdkResult<String> {
        Ok(self
            .refs
            .current_branch()?
            .unwrap_or_else(|| self.config.default_branch.clone()))
    }

    /// The commit at the tip of `branch`. `None` for an unborn branch.
    pub fn head_commit(&self, branch: &str) -> SdkResult<Option<ObjectId>> {
        Ok(self.refs.resolve_ref(&full_ref_name(branch)?)?)
    }

    /// The tree of the commit at the tip of `branch`.
    pub fn head_tree(&self, branch: &str) -> SdkResult<Option<ObjectId>> {
        match self.head_commit(branch)? {
            Some(commit) => Ok(Some(self.store.read_commit(&commit)?.tree)),
            None => Ok(None),
        }
    }

    /// Create `name` at the current branch's tip.
    pub fn create_branch(&self, name: &str) -> SdkResult<ObjectId> {
        validate_branch_name(name)?;
        let current = self.current_branch()?;
        let tip = self
            .head_commit(&current)?
            .ok_or_else(|| SdkError::BranchNotFound(current.clone()))?;
        self.refs
            .update_ref(&branch_ref_name(name), None, tip)
            .map_err(|source| SdkError::RefConflict {
                commit: tip,
                source,
            })?;
        Ok(tip)
    }

    pub fn switch_branch(&self, name: &str) -> SdkResult<()> {
        if self.refs.read_ref(&branch_ref_name(name))?.is_none() {
            return Err(SdkError::BranchNotFound(name.into()));
        }
        self.refs.set_head(name)?;
        Ok(())
    }

    pub fn branches(&self) -> SdkResult<Vec<BranchInfo>> {
        Ok(self.refs.branches()?)
    }

    // ---- Accessors ----

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn refs(&self) -> &Arc<dyn RefStore> {
        &self.refs
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }
}

/// Accept a short branch name or a full `refs/...` name.
fn full_ref_name(name: &str) -> SdkResult<String> {
    if name.starts_with("refs/") {
        twig_refs::validate_ref_name(name)?;
        Ok(name.to_string())
    } else {
        validate_branch_name(name)?;
        Ok(branch_ref_name(name))
    }
}
