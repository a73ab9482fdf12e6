//! Primary-store error types.

use thiserror::Error;

/// Errors from the primary-store interface.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Failed to reach the primary store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A change stream or table iteration failed mid-flight.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// A row could not be decoded into a document.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl StoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a stream error.
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::StreamError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }
}
