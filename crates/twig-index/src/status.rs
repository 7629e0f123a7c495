//! Grouped view of a change set.

use serde::{Deserialize, Serialize};

use crate::path::RepoPath;

/// Staged paths grouped by what will happen to them, each list in path order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Paths that will hold new content.
    pub writes: Vec<RepoPath>,
    /// Deletions not yet matched against a base tree.
    pub pending_deletions: Vec<RepoPath>,
    /// Deletions that removed an entry during the last patch.
    pub applied_deletions: Vec<RepoPath>,
}

impl ChangeSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing is staged.
    pub fn is_clean(&self) -> bool {
        self.writes.is_empty()
            && self.pending_deletions.is_empty()
            && self.applied_deletions.is_empty()
    }

    pub fn total_entries(&self) -> usize {
        self.writes.len() + self.pending_deletions.len() + self.applied_deletions.len()
    }
}
