//! # Table Sync Repository
//!
//! Traits and implementations for the storage edges of the table-sync
//! pipeline: the search-cluster provider (index management plus framed bulk
//! writes) and the primary-store interface the core consumes. Also home to
//! the schema derivation and bulk-action framing the provider depends on.

pub mod bulk;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod schema;

pub use bulk::{document_request, BulkAction, BulkOp, DocumentWrite};
pub use errors::{SearchIndexError, StoreError};
pub use interfaces::{ChangeStream, DocumentStore, DocumentStream, SearchIndexProvider};
pub use memory::MemoryStore;
pub use opensearch::{OpenSearchProvider, SearchConfig};
pub use schema::{build_schema, build_schemas, mappings_equivalent};
