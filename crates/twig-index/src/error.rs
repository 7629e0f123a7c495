//! Error types for the index crate.

/// Errors that can occur while recording pending changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// The path cannot name a file inside the repository.
    #[error("malformed path {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },
}

impl IndexError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
