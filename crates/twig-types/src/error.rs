use thiserror::Error;

/// Errors from parsing object ids and validating identities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The text is not hex.
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}
