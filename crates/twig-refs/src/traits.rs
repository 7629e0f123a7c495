//! The [`RefStore`] trait defining the reference storage interface.
//!
//! Any backend (in-memory, filesystem, database) implements this trait to
//! provide named reference management.

use twig_types::ObjectId;

use crate::error::{RefError, RefUpdateError, Result};
use crate::names::{branch_ref_name, HEADS_PREFIX};
use crate::types::{BranchInfo, Head, Ref, UpdateOutcome};

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`). Refs are addressed
/// by full name under `refs/` (branches under `refs/heads/`).
///
/// The only way to move a ref is [`RefStore::update_ref`], which must be
/// atomic with respect to every other writer of the same store: of two
/// updates that name the same `expected` value, at most one succeeds.
pub trait RefStore: Send + Sync {
    /// Read a ref by its full name (e.g. "refs/heads/main").
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Atomically point `name` at `new` if it currently holds `expected`.
    ///
    /// `expected == None` means the ref must not exist yet.
    fn update_ref(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> std::result::Result<UpdateOutcome, RefUpdateError>;

    /// Delete a ref by full name.
    ///
    /// Returns `Ok(true)` if the ref existed and was deleted, `Ok(false)` if
    /// it did not exist.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose full name starts with `prefix`, sorted by name.
    ///
    /// Pass `""` to list all refs. Pass `"refs/heads/"` for branches only.
    fn list_refs(&self, prefix: &str) -> Result<Vec<Ref>>;

    /// Read the current HEAD state.
    ///
    /// Returns `Ok(None)` if HEAD has not been set.
    fn head(&self) -> Result<Option<Head>>;

    /// Set HEAD to point at a branch (symbolic ref).
    fn set_head(&self, branch: &str) -> Result<()>;

    /// Set HEAD to a detached state pointing directly at a commit.
    fn set_head_detached(&self, target: ObjectId) -> Result<()>;

    /// The commit a ref points to, if the ref exists.
    fn resolve_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        Ok(self.read_ref(name)?.map(|r| r.target))
    }

    /// Short name of the branch HEAD points at.
    ///
    /// Fails with [`RefError::DetachedHead`] when HEAD is detached.
    fn current_branch(&self) -> Result<Option<String>> {
        match self.head()? {
            None => Ok(None),
            Some(Head::Symbolic(branch)) => Ok(Some(branch)),
            Some(Head::Detached(_)) => Err(RefError::DetachedHead),
        }
    }

    /// The commit HEAD resolves to, following a symbolic HEAD through its
    /// branch. `None` for an unset HEAD or an unborn branch.
    fn resolve_head(&self) -> Result<Option<ObjectId>> {
        match self.head()? {
            None => Ok(None),
            Some(Head::Symbolic(branch)) => self.resolve_ref(&branch_ref_name(&branch)),
            Some(Head::Detached(target)) => Ok(Some(target)),
        }
    }

    /// List all branches.
    fn branches(&self) -> Result<Vec<BranchInfo>> {
        let current = match self.head()? {
            Some(Head::Symbolic(branch)) => Some(branch),
            _ => None,
        };
        Ok(self
            .list_refs(HEADS_PREFIX)?
            .into_iter()
            .map(|r| {
                let name = r.short_name().to_string();
                BranchInfo {
                    is_current: current.as_deref() == Some(name.as_str()),
                    name,
                    target: r.target,
                }
            })
            .collect())
    }
}

/// Decide a compare-and-swap given the value currently stored under `name`.
///
/// Backends call this while holding their write lock and persist `new`
/// unless the outcome is [`UpdateOutcome::Unchanged`].
pub(crate) fn check_expected(
    name: &str,
    current: Option<ObjectId>,
    expected: Option<ObjectId>,
    new: ObjectId,
) -> std::result::Result<UpdateOutcome, RefUpdateError> {
    match (current, expected) {
        (None, None) => Ok(UpdateOutcome::Created),
        (None, Some(expected)) => {
            tracing::warn!(name, expected = %expected.short_hex(), "ref update refused: ref missing");
            Err(RefUpdateError::NotFound {
                name: name.to_string(),
                expected,
            })
        }
        (Some(actual), Some(expected)) if actual == expected => {
            if actual == new {
                Ok(UpdateOutcome::Unchanged)
            } else {
                Ok(UpdateOutcome::Updated { old: actual })
            }
        }
        (Some(actual), expected) => {
            tracing::warn!(
                name,
                expected = ?expected.map(|id| id.short_hex()),
                actual = %actual.short_hex(),
                "ref update refused: ref moved"
            );
            Err(RefUpdateError::Rejected {
                name: name.to_string(),
                expected,
                actual,
            })
        }
    }
}
