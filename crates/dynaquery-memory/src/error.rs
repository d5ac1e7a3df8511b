//! Errors raised by the in-memory store.

use crate::expression::ExpressionError;
use crate::storage::StorageError;

/// Errors produced by [`crate::MemoryStore`].
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// No table with this name exists.
    #[error("requested resource not found: table {0} not found")]
    TableNotFound(String),
    /// A table with this name already exists.
    #[error("table already exists: {0}")]
    TableExists(String),
    /// The request carries no table name.
    #[error("request has no table name")]
    MissingTableName,
    /// The key-condition expression cannot drive a query.
    #[error("invalid key condition: {0}")]
    InvalidKeyCondition(String),
    /// The request is malformed.
    #[error("validation error: {0}")]
    Validation(String),
    /// Storage rejected the item or key.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An expression failed to parse or evaluate.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

impl MemoryError {
    /// Shorthand for [`MemoryError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
