//! Search index provider trait definition.
//!
//! Abstracts the search cluster behind the handful of operations the table
//! manager needs, so implementations can be swapped and tests can inject
//! recording mocks.

use async_trait::async_trait;
use serde_json::Value;

use crate::bulk::BulkAction;
use crate::errors::SearchIndexError;

/// Abstracts the underlying search cluster (Elasticsearch 7 compatible).
///
/// All methods return `Result<T, SearchIndexError>` for consistent error
/// handling across implementations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Whether the index exists (`HEAD /{index}`).
    async fn exists(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// Delete the index (`DELETE /{index}`). Returns whether the cluster
    /// acknowledged the deletion; a missing index yields `false`.
    async fn delete_index(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// The live `mappings` subobject of the index (`GET /{index}`), or
    /// `None` on any non-2xx response.
    async fn get_mapping(&self, index: &str) -> Result<Option<Value>, SearchIndexError>;

    /// Create the index with the given settings + mappings document
    /// (`PUT /{index}`).
    async fn put_mapping(&self, index: &str, schema: &str) -> Result<(), SearchIndexError>;

    /// Post framed actions to `POST /_bulk`. The body is newline-delimited
    /// JSON terminated by a newline; any non-2xx status is an error.
    async fn bulk(&self, actions: Vec<BulkAction>) -> Result<(), SearchIndexError>;

    /// Remove every document from the given indices — all indices when
    /// `None` — with a match-all delete-by-query.
    async fn empty(&self, indices: Option<&[String]>) -> Result<bool, SearchIndexError>;
}
