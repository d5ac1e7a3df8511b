//! SDK executor errors.

/// Errors raised while translating SDK responses.
#[derive(Debug, thiserror::Error)]
pub enum SdkExecutorError {
    /// The SDK returned an attribute value variant this crate does not know.
    #[error("unsupported attribute value returned by the store: {0}")]
    UnknownAttributeValue(String),
}
