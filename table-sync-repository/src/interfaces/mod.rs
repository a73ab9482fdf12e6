//! Abstract interfaces consumed by the table manager.

mod document_store;
mod search_index_provider;

pub use document_store::{ChangeStream, DocumentStore, DocumentStream};
pub use search_index_provider::SearchIndexProvider;
