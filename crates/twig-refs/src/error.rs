//! Error types for reference operations.

use thiserror::Error;
use twig_types::ObjectId;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// The ref or branch name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// HEAD is in a detached state (not pointing to a branch).
    #[error("HEAD is detached")]
    DetachedHead,

    /// Cannot delete the currently checked-out branch.
    #[error("cannot delete current branch: {name}")]
    DeleteCurrentBranch { name: String },

    /// A stored ref could not be parsed.
    #[error("corrupt ref {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// A writer panicked while holding the in-memory lock.
    #[error("ref store lock poisoned")]
    Poisoned,

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;

/// Failure of a compare-and-swap ref update.
#[derive(Debug, Error)]
pub enum RefUpdateError {
    /// The ref no longer holds the expected value. Also returned when the
    /// caller expected the ref to be absent but it exists.
    #[error("ref {name} moved: expected {expected:?}, found {actual}")]
    Rejected {
        name: String,
        expected: Option<ObjectId>,
        actual: ObjectId,
    },

    /// The caller expected a value but the ref does not exist.
    #[error("ref {name} does not exist (expected {expected})")]
    NotFound { name: String, expected: ObjectId },

    /// Another writer holds the ref's lock.
    #[error("ref {name} is locked by another writer")]
    LockFailure { name: String },

    /// Name validation, I/O or parse failure.
    #[error(transparent)]
    Ref(#[from] RefError),
}

impl RefUpdateError {
    /// `true` when the update lost a race and may succeed against a fresh
    /// read of the ref.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::NotFound { .. } | Self::LockFailure { .. }
        )
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Rejected { name, .. }
            | Self::NotFound { name, .. }
            | Self::LockFailure { name } => Some(name),
            Self::Ref(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn races_are_retryable_but_invalid_names_are_not() {
        let id = ObjectId::from_bytes(b"c1");
        let rejected = RefUpdateError::Rejected {
            name: "refs/heads/main".into(),
            expected: None,
            actual: id,
        };
        assert!(rejected.is_retryable());
        assert_eq!(rejected.name(), Some("refs/heads/main"));
        assert!(RefUpdateError::LockFailure { name: "x".into() }.is_retryable());

        let invalid = RefUpdateError::from(RefError::InvalidName {
            name: "bad..name".into(),
            reason: "must not contain '..'".into(),
        });
        assert!(!invalid.is_retryable());
        assert!(invalid.name().is_none());
    }
}
