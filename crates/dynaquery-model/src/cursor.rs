//! Opaque continuation cursors.
//!
//! A cursor is the base64 text of the JSON-encoded last evaluated key. Callers
//! treat it as an opaque token; only executors look inside.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::attribute_value::Item;
use crate::error::ModelError;

/// Opaque token for resuming a paginated query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a token produced elsewhere (persisted, received from a client).
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Encode a last evaluated key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidCursor` if the key cannot be serialized.
    pub fn from_key(key: &Item) -> Result<Self, ModelError> {
        let json = serde_json::to_vec(key).map_err(|e| ModelError::InvalidCursor(e.to_string()))?;
        Ok(Self(BASE64.encode(json)))
    }

    /// Decode the exclusive start key this cursor stands for.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidCursor` for tokens that were not produced by
    /// [`Cursor::from_key`].
    pub fn to_key(&self) -> Result<Item, ModelError> {
        let json = BASE64
            .decode(&self.0)
            .map_err(|e| ModelError::InvalidCursor(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| ModelError::InvalidCursor(e.to_string()))
    }

    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
