use thiserror::Error;
use twig_index::IndexError;
use twig_patch::PatchError;
use twig_refs::{RefError, RefUpdateError};
use twig_store::StoreError;
use twig_types::ObjectId;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    MalformedPath(#[from] IndexError),

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// A stored object could not be decoded.
    #[error("store read failed: {0}")]
    StoreReadFailure(#[source] StoreError),

    #[error("store write failed: {0}")]
    StoreWriteFailure(#[source] StoreError),

    #[error("base tree not found: {0}")]
    BaseNotFound(ObjectId),

    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    /// The branch moved between reading its head and publishing. The commit
    /// object exists in the store but nothing references it.
    #[error("ref conflict publishing {commit}: {source}")]
    RefConflict {
        commit: ObjectId,
        #[source]
        source: RefUpdateError,
    },

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("nothing to commit: tree {tree} is unchanged")]
    NothingToCommit { tree: ObjectId },

    #[error("config error: {0}")]
    Config(String),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),
}

impl SdkError {
    /// Whether retrying against a fresh branch head may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SdkError::RefConflict { source, .. } if source.is_retryable())
    }
}

impl From<StoreError> for SdkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SdkError::ObjectNotFound(id),
            e @ StoreError::CorruptObject { .. } => SdkError::StoreReadFailure(e),
            other => SdkError::StoreWriteFailure(other),
        }
    }
}

impl From<PatchError> for SdkError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::BaseNotFound(id) => SdkError::BaseNotFound(id),
            PatchError::Store(e) => e.into(),
            PatchError::Path(e) => SdkError::MalformedPath(e),
            PatchError::MissingAuthor => SdkError::InvalidCommit("commit has no author".into()),
            PatchError::Identity(e) => SdkError::InvalidCommit(e.to_string()),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
