//! Error types for the table manager.

use thiserror::Error;

use table_sync_repository::errors::{SearchIndexError, StoreError};
use table_sync_shared::ModelError;

/// Errors surfaced by the table manager and its components.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The managed model set failed validation.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// A search cluster operation failed.
    #[error("Search index error: {0}")]
    SearchIndex(#[from] SearchIndexError),

    /// A primary store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An operation named a model outside the managed set.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Invalid runtime configuration.
    #[error("Config error: {0}")]
    Config(String),
}

impl SyncError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
