//! The pending change set: a flat, path-keyed staging area.
//!
//! [`ChangeSet`] holds a `BTreeMap<RepoPath, PendingChange>`. Because paths
//! order byte-wise, every change below a directory `/d` sits in one
//! contiguous run starting at `/d/`, so the changes for a single directory
//! level come from one range scan instead of a nested map.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::IndexResult;
use crate::path::RepoPath;
use crate::status::ChangeSummary;

/// Lifecycle of a pending deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tombstone {
    /// Registered, not yet matched against a base tree.
    Pending,
    /// Observed in the base tree and removed by a patch.
    Applied,
}

/// A single staged edit.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingChange {
    /// The path holds this file content after patching.
    Write(Vec<u8>),
    /// Nothing exists at the path after patching.
    Delete(Tombstone),
}

impl PendingChange {
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete(_))
    }
}

impl std::fmt::Debug for PendingChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write(data) => write!(f, "Write({} bytes)", data.len()),
            Self::Delete(state) => write!(f, "Delete({state:?})"),
        }
    }
}

/// Changes that affect one directory level, as seen from that directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectoryChanges<'a> {
    /// Changes whose parent is the directory itself, keyed by entry name.
    pub direct: BTreeMap<&'a str, &'a PendingChange>,
    /// Names of children that have changes somewhere below them.
    pub nested: BTreeSet<&'a str>,
}

impl<'a> DirectoryChanges<'a> {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.nested.is_empty()
    }

    /// `true` if the child `name` has a change at or below it.
    pub fn touches(&self, name: &str) -> bool {
        self.direct.contains_key(name) || self.nested.contains(name)
    }
}

/// The staging area for the next commit.
///
/// One entry per normalized path; registering a path again replaces the
/// earlier change. To keep a path from being both a file and a directory:
///
/// - a change at `P` discards every pending change strictly below `P`;
/// - a change below `P` discards a pending write at `P`. A pending delete at
///   `P` is kept and means the base contents of `P` are dropped before the
///   changes below it are applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: BTreeMap<RepoPath, PendingChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &RepoPath) -> Option<&PendingChange> {
        self.entries.get(path)
    }

    /// All changes in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&RepoPath, &PendingChange)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // ---------------------------------------------------------------
    // Registering changes
    // ---------------------------------------------------------------

    /// Stage `content` to be written at `path`.
    pub fn add(&mut self, path: &str, content: impl Into<Vec<u8>>) -> IndexResult<RepoPath> {
        let path = RepoPath::parse(path)?;
        self.insert(path.clone(), PendingChange::Write(content.into()));
        Ok(path)
    }

    /// Stage the removal of whatever exists at `path`.
    pub fn delete(&mut self, path: &str) -> IndexResult<RepoPath> {
        let path = RepoPath::parse(path)?;
        self.insert(path.clone(), PendingChange::Delete(Tombstone::Pending));
        Ok(path)
    }

    /// Register a change at an already-normalized path.
    ///
    /// Returns the change it replaced at the same path, if any.
    pub fn insert(&mut self, path: RepoPath, change: PendingChange) -> Option<PendingChange> {
        let shadowed: Vec<RepoPath> = self.beneath(&path).map(|(p, _)| p.clone()).collect();
        for descendant in &shadowed {
            self.entries.remove(descendant);
        }
        if change.is_delete() && self.has_deletion_above(&path) {
            // The ancestor deletion already removes it.
            trace!(path = %path, "deletion covered by pending ancestor deletion");
            return self.entries.remove(&path);
        }
        for ancestor in path.ancestors() {
            if matches!(self.entries.get(&ancestor), Some(PendingChange::Write(_))) {
                trace!(path = %ancestor, "pending write superseded by nested change");
                self.entries.remove(&ancestor);
            }
        }
        trace!(path = %path, change = ?change, dropped = shadowed.len(), "staged change");
        self.entries.insert(path, change)
    }

    fn has_deletion_above(&self, path: &RepoPath) -> bool {
        path.ancestors()
            .any(|ancestor| matches!(self.entries.get(&ancestor), Some(PendingChange::Delete(_))))
    }

    /// Remove the staged change at `path`.
    pub fn remove(&mut self, path: &RepoPath) -> Option<PendingChange> {
        self.entries.remove(path)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Changes strictly below `dir`, in path order.
    pub fn beneath<'a>(
        &'a self,
        dir: &RepoPath,
    ) -> impl Iterator<Item = (&'a RepoPath, &'a PendingChange)> + 'a {
        let prefix = dir.dir_prefix();
        self.entries
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(move |(path, _)| path.as_str().starts_with(&prefix))
    }

    /// `true` if anything is staged strictly below `dir`.
    pub fn has_changes_beneath(&self, dir: &RepoPath) -> bool {
        self.beneath(dir).next().is_some()
    }

    /// Split the changes below `dir` into direct children and the names of
    /// children with deeper changes.
    pub fn directory(&self, dir: &RepoPath) -> DirectoryChanges<'_> {
        let mut level = DirectoryChanges::default();
        let depth = dir.dir_prefix().len();
        for (path, change) in self.beneath(dir) {
            let rest = &path.as_str()[depth..];
            match rest.split_once('/') {
                None => {
                    level.direct.insert(rest, change);
                }
                Some((first, _)) => {
                    level.nested.insert(first);
                }
            }
        }
        level
    }

    // ---------------------------------------------------------------
    // Tombstones
    // ---------------------------------------------------------------

    /// Record that the deletion at `path` removed an entry from a base tree.
    ///
    /// Returns `false` if no deletion is staged at `path`.
    pub fn mark_applied(&mut self, path: &RepoPath) -> bool {
        match self.entries.get_mut(path) {
            Some(PendingChange::Delete(state)) => {
                *state = Tombstone::Applied;
                true
            }
            _ => false,
        }
    }

    /// Staged writes in path order.
    pub fn writes(&self) -> impl Iterator<Item = (&RepoPath, &[u8])> {
        self.entries.iter().filter_map(|(path, change)| match change {
            PendingChange::Write(data) => Some((path, data.as_slice())),
            PendingChange::Delete(_) => None,
        })
    }

    /// Staged deletions in path order, with their tombstone state.
    pub fn deletions(&self) -> impl Iterator<Item = (&RepoPath, Tombstone)> {
        self.entries.iter().filter_map(|(path, change)| match change {
            PendingChange::Delete(state) => Some((path, *state)),
            PendingChange::Write(_) => None,
        })
    }

    /// Group staged paths by kind of change.
    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::new();
        for (path, change) in &self.entries {
            match change {
                PendingChange::Write(_) => summary.writes.push(path.clone()),
                PendingChange::Delete(Tombstone::Pending) => {
                    summary.pending_deletions.push(path.clone())
                }
                PendingChange::Delete(Tombstone::Applied) => {
                    summary.applied_deletions.push(path.clone())
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use proptest::prelude::*;

    fn p(raw: &str) -> RepoPath {
        RepoPath::parse(raw).unwrap()
    }

    fn paths(changes: &ChangeSet) -> Vec<&str> {
        changes.iter().map(|(path, _)| path.as_str()).collect()
    }

    // ---------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------

    #[test]
    fn new_change_set_is_empty() {
        let changes = ChangeSet::new();
        assert!(changes.is_empty());
        assert_eq!(changes.len(), 0);
    }

    #[test]
    fn add_normalizes_path() {
        let mut changes = ChangeSet::new();
        let path = changes.add("test1/this.txt", "content").unwrap();
        assert_eq!(path.as_str(), "/test1/this.txt");
        assert_eq!(
            changes.get(&p("/test1/this.txt")),
            Some(&PendingChange::Write(b"content".to_vec()))
        );
    }

    #[test]
    fn malformed_paths_are_rejected_at_registration() {
        let mut changes = ChangeSet::new();
        assert!(matches!(
            changes.add("", "x"),
            Err(IndexError::MalformedPath { .. })
        ));
        assert!(changes.delete("a/../b").is_err());
        assert!(changes.is_empty());
    }

    #[test]
    fn last_write_wins() {
        let mut changes = ChangeSet::new();
        changes.add("/x", "first").unwrap();
        let replaced = changes.insert(p("/x"), PendingChange::Write(b"second".to_vec()));
        assert_eq!(replaced, Some(PendingChange::Write(b"first".to_vec())));
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes.get(&p("/x")),
            Some(&PendingChange::Write(b"second".to_vec()))
        );
    }

    #[test]
    fn delete_then_add_keeps_only_the_add() {
        let mut changes = ChangeSet::new();
        changes.delete("/x").unwrap();
        changes.add("/x", "C").unwrap();

        let mut only_add = ChangeSet::new();
        only_add.add("/x", "C").unwrap();
        assert_eq!(changes, only_add);
    }

    #[test]
    fn change_at_directory_drops_changes_beneath() {
        let mut changes = ChangeSet::new();
        changes.add("/d/a.txt", "a").unwrap();
        changes.delete("/d/sub/b.txt").unwrap();
        changes.add("/dx", "sibling").unwrap();
        changes.add("/d", "now a file").unwrap();
        assert_eq!(paths(&changes), vec!["/d", "/dx"]);
    }

    #[test]
    fn nested_change_drops_pending_write_on_ancestor() {
        let mut changes = ChangeSet::new();
        changes.add("/d", "file").unwrap();
        changes.add("/d/inner.txt", "x").unwrap();
        assert_eq!(paths(&changes), vec!["/d/inner.txt"]);
    }

    #[test]
    fn nested_change_keeps_pending_delete_on_ancestor() {
        let mut changes = ChangeSet::new();
        changes.delete("/d").unwrap();
        changes.add("/d/fresh.txt", "x").unwrap();
        assert_eq!(paths(&changes), vec!["/d", "/d/fresh.txt"]);
        assert!(changes.get(&p("/d")).unwrap().is_delete());
    }

    #[test]
    fn deletion_under_pending_deletion_is_not_staged() {
        let mut changes = ChangeSet::new();
        changes.delete("/d").unwrap();
        changes.add("/d/x", "draft").unwrap();
        let replaced = changes.insert(p("/d/x"), PendingChange::Delete(Tombstone::Pending));
        assert!(replaced.unwrap().is_write());
        changes.delete("/d/e/f").unwrap();
        assert_eq!(paths(&changes), vec!["/d"]);
    }

    // ---------------------------------------------------------------
    // Directory queries
    // ---------------------------------------------------------------

    #[test]
    fn beneath_does_not_leak_into_siblings_with_shared_prefix() {
        let mut changes = ChangeSet::new();
        changes.add("/a.txt", "1").unwrap();
        changes.add("/a/b", "2").unwrap();
        changes.add("/a0", "3").unwrap();
        changes.add("/ab/c", "4").unwrap();
        let below: Vec<&str> = changes.beneath(&p("/a")).map(|(path, _)| path.as_str()).collect();
        assert_eq!(below, vec!["/a/b"]);
        assert!(!changes.has_changes_beneath(&p("/a0")));
        assert_eq!(changes.beneath(&RepoPath::root()).count(), 4);
    }

    #[test]
    fn directory_partitions_direct_and_nested() {
        let mut changes = ChangeSet::new();
        changes.add("/test1/this.txt", "1").unwrap();
        changes.add("/testnieuw/this.txt", "2").unwrap();
        changes.delete("/test1/tester").unwrap();
        changes.add("/test1/test2/test3/test", "3").unwrap();
        changes.add("/top.txt", "4").unwrap();

        let root = changes.directory(&RepoPath::root());
        assert_eq!(root.direct.keys().copied().collect::<Vec<_>>(), vec!["top.txt"]);
        assert_eq!(
            root.nested.iter().copied().collect::<Vec<_>>(),
            vec!["test1", "testnieuw"]
        );

        let test1 = changes.directory(&p("/test1"));
        assert_eq!(
            test1.direct.keys().copied().collect::<Vec<_>>(),
            vec!["tester", "this.txt"]
        );
        assert!(test1.direct["tester"].is_delete());
        assert_eq!(test1.nested.iter().copied().collect::<Vec<_>>(), vec!["test2"]);
        assert!(test1.touches("test2"));
        assert!(!test1.touches("other"));

        assert!(changes.directory(&p("/elsewhere")).is_empty());
    }

    // ---------------------------------------------------------------
    // Tombstones and summaries
    // ---------------------------------------------------------------

    #[test]
    fn mark_applied_only_affects_deletions() {
        let mut changes = ChangeSet::new();
        changes.delete("/gone").unwrap();
        changes.add("/kept", "x").unwrap();

        assert!(changes.mark_applied(&p("/gone")));
        assert!(!changes.mark_applied(&p("/kept")));
        assert!(!changes.mark_applied(&p("/missing")));
        assert_eq!(
            changes.deletions().collect::<Vec<_>>(),
            vec![(&p("/gone"), Tombstone::Applied)]
        );
    }

    #[test]
    fn summary_groups_by_state() {
        let mut changes = ChangeSet::new();
        changes.add("/w", "x").unwrap();
        changes.delete("/d1").unwrap();
        changes.delete("/d2").unwrap();
        changes.mark_applied(&p("/d2"));

        let summary = changes.summary();
        assert_eq!(summary.writes, vec![p("/w")]);
        assert_eq!(summary.pending_deletions, vec![p("/d1")]);
        assert_eq!(summary.applied_deletions, vec![p("/d2")]);
        assert_eq!(summary.total_entries(), 3);
        assert_eq!(changes.writes().count(), 1);
    }

    #[test]
    fn debug_hides_content() {
        let change = PendingChange::Write(vec![0; 1024]);
        assert_eq!(format!("{change:?}"), "Write(1024 bytes)");
    }

    proptest! {
        /// After any sequence of registrations no staged path has a staged
        /// write on one of its ancestors.
        #[test]
        fn no_write_ever_shadows_a_nested_change(
            ops in proptest::collection::vec(
                (proptest::collection::vec("[ab]", 1..4), any::<bool>()),
                0..24,
            )
        ) {
            let mut changes = ChangeSet::new();
            for (segments, is_write) in ops {
                let raw = segments.join("/");
                if is_write {
                    changes.add(&raw, raw.clone()).unwrap();
                } else {
                    changes.delete(&raw).unwrap();
                }
            }
            for (path, _) in changes.iter() {
                for ancestor in path.ancestors() {
                    prop_assert!(!matches!(changes.get(&ancestor), Some(PendingChange::Write(_))));
                }
            }
        }
    }
}
