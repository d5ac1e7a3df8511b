//! Model-level errors.

/// Errors raised while constructing or decoding model values.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A number literal is not a finite decimal.
    #[error("invalid number literal: {0:?}")]
    InvalidNumber(String),
    /// A continuation cursor could not be decoded back into a key.
    #[error("invalid continuation cursor: {0}")]
    InvalidCursor(String),
}
