//! Search index error types.

use std::time::Duration;

use thiserror::Error;

/// Unified errors from search index operations.
///
/// Used by the `SearchIndexProvider` trait and the schema derivation for all
/// search-cluster work, covering both transport failures and the
/// configuration errors raised while deriving mappings.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g. a document without an id).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the search cluster.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// No pooled connection became available within the checkout timeout.
    #[error("Connection pool checkout timed out after {0:?}")]
    PoolTimeout(Duration),

    /// An `es_type` override names a type outside the supported set.
    #[error("Invalid field type: {0}")]
    InvalidFieldType(String),

    /// A parent and a child declare the same property with different types.
    #[error("Property {property} maps to both {existing} and {conflicting}")]
    PropertyConflict {
        property: String,
        existing: String,
        conflicting: String,
    },

    /// The cluster rejected an index mapping.
    #[error("Mapping failed for index {index}: {reason}")]
    MappingFailed { index: String, reason: String },

    /// A bulk write failed.
    #[error("Bulk write failed: {0}")]
    BulkFailed(String),

    /// Failed to parse a response from the search cluster.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a request body.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an invalid field type error.
    pub fn invalid_field_type(msg: impl Into<String>) -> Self {
        Self::InvalidFieldType(msg.into())
    }

    /// Create a mapping failure.
    pub fn mapping_failed(index: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MappingFailed {
            index: index.into(),
            reason: reason.into(),
        }
    }

    /// Create a bulk failure.
    pub fn bulk_failed(msg: impl Into<String>) -> Self {
        Self::BulkFailed(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}
