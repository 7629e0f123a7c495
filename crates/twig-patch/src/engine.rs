//! The sparse tree-patch engine.
//!
//! One call to [`TreePatcher::patch`] walks the base tree top-down, but only
//! into directories that the change set touches. At each level the engine
//! enumerates the base directory once, splices in the pending writes and
//! deletions for that level, recurses into touched subdirectories, and
//! writes a new tree object. Untouched entries are copied by id.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use twig_index::{ChangeSet, PendingChange, RepoPath};
use twig_store::{ObjectStore, StoreError, TreeEntry};
use twig_types::ObjectId;

use crate::error::{PatchError, PatchResult};

/// Policy knobs for a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOptions {
    /// Drop subdirectories left with no entries instead of keeping them as
    /// empty trees. The root is never pruned.
    pub prune_empty_trees: bool,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            prune_empty_trees: true,
        }
    }
}

/// Counters describing the work a patch did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchStats {
    /// Blobs inserted for pending writes.
    pub blobs_written: usize,
    /// Tree objects inserted.
    pub trees_written: usize,
    /// Touched directories whose result equalled their base tree.
    pub trees_reused: usize,
    /// Subdirectories dropped because they ended up empty.
    pub dirs_pruned: usize,
}

/// Result of a successful patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Id of the patched tree.
    pub tree: ObjectId,
    /// Pending deletions that removed an entry from the base, in the order
    /// they were applied.
    pub applied_deletions: Vec<RepoPath>,
    pub stats: PatchStats,
}

impl PatchOutcome {
    /// Flip the tombstones of every applied deletion in `changes`.
    pub fn mark_applied(&self, changes: &mut ChangeSet) {
        for path in &self.applied_deletions {
            changes.mark_applied(path);
        }
    }
}

#[derive(Default)]
struct PatchRun {
    applied_deletions: Vec<RepoPath>,
    stats: PatchStats,
}

/// Applies change sets to trees in an [`ObjectStore`].
///
/// The patcher holds no mutable state; one instance can serve any number of
/// concurrent patches.
pub struct TreePatcher {
    store: Arc<dyn ObjectStore>,
    options: PatchOptions,
}

impl std::fmt::Debug for TreePatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreePatcher")
            .field("options", &self.options)
            .finish()
    }
}

impl TreePatcher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            options: PatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> PatchOptions {
        self.options
    }

    /// Patch the whole tree: shorthand for [`TreePatcher::patch`] at `/`.
    pub fn patch_root(
        &self,
        base_tree: Option<ObjectId>,
        changes: &ChangeSet,
    ) -> PatchResult<PatchOutcome> {
        self.patch(base_tree, changes, &RepoPath::root())
    }

    /// Apply the changes at or below `base_path` to `base_tree`.
    ///
    /// `base_tree` is the tree found at `base_path`; `None` patches an empty
    /// directory. Changes outside `base_path` are ignored. The change set is
    /// not modified; deletions that removed something are reported in
    /// [`PatchOutcome::applied_deletions`].
    pub fn patch(
        &self,
        base_tree: Option<ObjectId>,
        changes: &ChangeSet,
        base_path: &RepoPath,
    ) -> PatchResult<PatchOutcome> {
        let mut run = PatchRun::default();
        let tree = match self.patch_dir(base_tree, changes, base_path, &mut run)? {
            Some(id) => id,
            None => self.write_tree(Vec::new(), &mut run)?,
        };
        debug!(
            base = ?base_tree.map(|id| id.short_hex()),
            tree = %tree.short_hex(),
            blobs = run.stats.blobs_written,
            trees = run.stats.trees_written,
            "patched tree"
        );
        Ok(PatchOutcome {
            tree,
            applied_deletions: run.applied_deletions,
            stats: run.stats,
        })
    }

    /// Patch one directory level.
    ///
    /// Returns `None` when the result is empty and differs from the base, so
    /// the caller can decide between pruning and writing an empty tree.
    fn patch_dir(
        &self,
        base: Option<ObjectId>,
        changes: &ChangeSet,
        dir: &RepoPath,
        run: &mut PatchRun,
    ) -> PatchResult<Option<ObjectId>> {
        let level = changes.directory(dir);
        let base_entries = match base {
            Some(id) => self.enumerate(id)?,
            None => Vec::new(),
        };

        let mut entries = Vec::with_capacity(base_entries.len() + level.direct.len());
        let mut reused = 0usize;

        for (name, change) in &level.direct {
            if let PendingChange::Write(data) = change {
                let blob = self.store.insert_blob(data)?;
                run.stats.blobs_written += 1;
                entries.push(TreeEntry::file(*name, blob));
            }
        }

        let mut in_base = BTreeSet::new();
        for entry in &base_entries {
            let name = entry.name.as_str();
            in_base.insert(name);
            let nested = level.nested.contains(name);
            match level.direct.get(name) {
                None if !nested => {
                    entries.push(entry.clone());
                    reused += 1;
                }
                // Replacement already emitted above.
                Some(PendingChange::Write(_)) => {}
                Some(PendingChange::Delete(_)) => {
                    run.applied_deletions.push(dir.join(name)?);
                    if nested {
                        self.patch_child(None, changes, dir, name, &mut entries, run)?;
                    }
                }
                None => {
                    let sub_base = entry.is_tree().then_some(entry.object_id);
                    self.patch_child(sub_base, changes, dir, name, &mut entries, run)?;
                }
            }
        }

        for name in level.nested.iter().filter(|name| !in_base.contains(*name)) {
            self.patch_child(None, changes, dir, name, &mut entries, run)?;
        }

        entries.sort_by(TreeEntry::canonical_cmp);
        debug!(path = %dir, entries = entries.len(), reused, "patched directory");

        if let Some(base_id) = base {
            if entries == base_entries {
                run.stats.trees_reused += 1;
                return Ok(Some(base_id));
            }
        }
        if entries.is_empty() {
            return Ok(None);
        }
        self.write_tree(entries, run).map(Some)
    }

    fn patch_child(
        &self,
        base: Option<ObjectId>,
        changes: &ChangeSet,
        dir: &RepoPath,
        name: &str,
        entries: &mut Vec<TreeEntry>,
        run: &mut PatchRun,
    ) -> PatchResult<()> {
        let path = dir.join(name)?;
        match self.patch_dir(base, changes, &path, run)? {
            Some(id) => entries.push(TreeEntry::dir(name, id)),
            // No base directory to keep.
            None if base.is_none() => {}
            None if self.options.prune_empty_trees => {
                run.stats.dirs_pruned += 1;
                debug!(path = %path, "pruned empty directory");
            }
            None => {
                let empty = self.write_tree(Vec::new(), run)?;
                entries.push(TreeEntry::dir(name, empty));
            }
        }
        Ok(())
    }

    fn enumerate(&self, id: ObjectId) -> PatchResult<Vec<TreeEntry>> {
        match self.store.enumerate_tree(&id) {
            Ok(entries) => Ok(entries.collect()),
            Err(StoreError::NotFound(missing)) => Err(PatchError::BaseNotFound(missing)),
            Err(e) => Err(e.into()),
        }
    }

    fn write_tree(&self, entries: Vec<TreeEntry>, run: &mut PatchRun) -> PatchResult<ObjectId> {
        let id = self.store.insert_tree(entries)?;
        run.stats.trees_written += 1;
        Ok(id)
    }
}
