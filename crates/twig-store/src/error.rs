use twig_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// An object could not be encoded for writing.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored data is undecodable, non-canonical or of the wrong kind.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A tree about to be written violates naming or ordering rules.
    #[error("malformed tree: {0}")]
    MalformedTree(String),

    /// Attempted to write a null object ID.
    #[error("cannot store object with null ID")]
    NullObjectId,

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store is read-only")]
    ReadOnly,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
