//! Error types for the classifier.

use thiserror::Error;

/// Result type alias for classifier operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Errors that can occur while building, running or restoring a classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// A hyperparameter is out of range or the step list is not usable.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// `compute` or `infer` was called with no active bits.
    #[error("input pattern has no active bits")]
    EmptyPattern,

    /// A saved state could not be decoded; nothing was loaded.
    #[error("malformed classifier state: {0}")]
    MalformedState(String),

    /// Reading from or writing to the underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary encoding of the structured record failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}
