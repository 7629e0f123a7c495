//! Core reference types.

use serde::{Deserialize, Serialize};
use twig_types::ObjectId;

use crate::names::HEADS_PREFIX;

/// A named pointer to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    /// Full ref name (e.g. "refs/heads/main").
    pub name: String,
    /// The commit this ref points to.
    pub target: ObjectId,
}

impl Ref {
    pub fn new(name: impl Into<String>, target: ObjectId) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    /// Returns `true` if this ref lives under `refs/heads/`.
    pub fn is_branch(&self) -> bool {
        self.name.starts_with(HEADS_PREFIX)
    }

    /// The name without its namespace (`main` for `refs/heads/main`).
    pub fn short_name(&self) -> &str {
        self.name
            .strip_prefix(HEADS_PREFIX)
            .or_else(|| self.name.strip_prefix("refs/"))
            .unwrap_or(&self.name)
    }
}

/// Summary information about a branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Short branch name.
    pub name: String,
    /// Commit at the branch tip.
    pub target: ObjectId,
    /// Whether HEAD points here.
    pub is_current: bool,
}

/// The state of HEAD: either symbolic (pointing to a branch) or detached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Head {
    /// HEAD names a branch. The branch need not exist yet (unborn).
    Symbolic(String),
    /// HEAD points directly at a commit.
    Detached(ObjectId),
}

/// Successful result of a compare-and-swap update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOutcome {
    /// The ref did not exist and now points at the new target.
    Created,
    /// The ref moved from `old` to the new target.
    Updated { old: ObjectId },
    /// The ref already pointed at the new target.
    Unchanged,
}
