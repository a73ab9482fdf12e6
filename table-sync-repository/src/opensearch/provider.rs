//! OpenSearch-backed provider implementation.
//!
//! Wraps the `opensearch` client behind `SearchIndexProvider`. A semaphore
//! in front of the transport supplies pool-checkout semantics: every request
//! holds one permit for its duration and a checkout that cannot acquire a
//! permit within the configured timeout fails instead of queueing forever.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetParts},
    BulkParts, DeleteByQueryParts, OpenSearch,
};
use serde_json::{json, Value};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::bulk::BulkAction;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::SearchConfig;

/// Pooled client for the search cluster.
pub struct OpenSearchProvider {
    client: OpenSearch,
    pool: Semaphore,
    checkout_timeout: Duration,
}

impl OpenSearchProvider {
    /// Connect to the cluster described by `config`.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchIndexError> {
        let url =
            Url::parse(&config.uri).map_err(|e| SearchIndexError::connection(e.to_string()))?;
        let transport = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        info!(
            uri = %config.uri,
            conn_pool = config.conn_pool,
            idle_pool = config.idle_pool,
            checkout_timeout = ?config.checkout_timeout,
            "Created search provider"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            pool: Semaphore::new(config.conn_pool),
            checkout_timeout: config.checkout_timeout,
        })
    }

    /// Check a connection out of the pool, bounded by the checkout timeout.
    async fn checkout(&self) -> Result<SemaphorePermit<'_>, SearchIndexError> {
        match timeout(self.checkout_timeout, self.pool.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(e)) => Err(SearchIndexError::connection(e.to_string())),
            Err(_) => Err(SearchIndexError::PoolTimeout(self.checkout_timeout)),
        }
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        let _conn = self.checkout().await?;
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        Ok(response.status_code().is_success())
    }

    async fn delete_index(&self, index: &str) -> Result<bool, SearchIndexError> {
        let _conn = self.checkout().await?;
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let deleted = response.status_code().is_success();
        debug!(index = %index, deleted, "Deleted index");
        Ok(deleted)
    }

    async fn get_mapping(&self, index: &str) -> Result<Option<Value>, SearchIndexError> {
        let _conn = self.checkout().await?;
        let response = self
            .client
            .indices()
            .get(IndicesGetParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Ok(None);
        }
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        Ok(body
            .get(index)
            .and_then(|entry| entry.get("mappings"))
            .cloned())
    }

    async fn put_mapping(&self, index: &str, schema: &str) -> Result<(), SearchIndexError> {
        let body: Value = serde_json::from_str(schema)
            .map_err(|e| SearchIndexError::serialization(e.to_string()))?;

        let _conn = self.checkout().await?;
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let response_body = response.text().await.unwrap_or_default();
            error!(
                index = %index,
                status = %status,
                schema = %schema,
                response = %response_body,
                "Index mapping rejected"
            );
            return Err(SearchIndexError::mapping_failed(
                index,
                format!("status {status}: {response_body}"),
            ));
        }

        debug!(index = %index, "Applied index mapping");
        Ok(())
    }

    async fn bulk(&self, actions: Vec<BulkAction>) -> Result<(), SearchIndexError> {
        if actions.is_empty() {
            return Ok(());
        }
        let body: Vec<JsonBody<Value>> = actions
            .iter()
            .flat_map(|action| action.lines())
            .map(JsonBody::new)
            .collect();

        let _conn = self.checkout().await?;
        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_failed(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let response_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::bulk_failed(format!(
                "status {status}: {response_body}"
            )));
        }

        let summary = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        if summary
            .get("errors")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            warn!(response = %summary, "Bulk request completed with item errors");
        }
        Ok(())
    }

    async fn empty(&self, indices: Option<&[String]>) -> Result<bool, SearchIndexError> {
        let targets: Vec<&str> = match indices {
            Some(list) => list.iter().map(String::as_str).collect(),
            None => vec!["_all"],
        };

        let _conn = self.checkout().await?;
        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&targets))
            .body(json!({ "query": { "match_all": {} } }))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        Ok(response.status_code().is_success())
    }
}
