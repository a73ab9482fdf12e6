//! Search provider backed by the `opensearch` client crate, which speaks the
//! Elasticsearch-7-compatible HTTP API.

mod config;
mod provider;

pub use config::SearchConfig;
pub use provider::OpenSearchProvider;
