//! Startup reconciliation of live index mappings against derived schemas.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backfill::Backfiller;
use crate::errors::SyncError;
use table_sync_repository::interfaces::SearchIndexProvider;
use table_sync_repository::schema::mappings_equivalent;
use table_sync_shared::ModelRegistry;

/// Compares live mappings with derived schemas and repairs drift.
pub struct Reconciler {
    registry: Arc<ModelRegistry>,
    schemas: Arc<HashMap<String, String>>,
    provider: Arc<dyn SearchIndexProvider>,
    backfiller: Backfiller,
}

impl Reconciler {
    pub fn new(
        registry: Arc<ModelRegistry>,
        schemas: Arc<HashMap<String, String>>,
        provider: Arc<dyn SearchIndexProvider>,
        backfiller: Backfiller,
    ) -> Self {
        Self {
            registry,
            schemas,
            provider,
            backfiller,
        }
    }

    /// Check every managed index and destructively reindex the whole set on
    /// any drift; partial repair would leave child documents in parent
    /// indices whose schemas diverged. Backfills afterwards when asked.
    pub async fn reconcile(&self, backfill: bool) -> Result<(), SyncError> {
        let mut drifted = Vec::new();
        for model in self.registry.models() {
            if self.index_drifted(&model.table).await? {
                drifted.push(model.table.as_str());
            }
        }

        if drifted.is_empty() {
            debug!("All index mappings match their derived schemas");
        } else {
            warn!(indices = ?drifted, "Index mappings missing or drifted, reindexing all");
            self.reindex_all().await?;
        }

        if backfill {
            self.backfiller.backfill_all().await?;
        }
        Ok(())
    }

    /// Delete and recreate every managed index with its derived schema, in
    /// parallel.
    pub async fn reindex_all(&self) -> Result<(), SyncError> {
        let results = join_all(
            self.registry
                .models()
                .iter()
                .map(|model| self.reindex(&model.table)),
        )
        .await;
        for result in results {
            result?;
        }
        Ok(())
    }

    /// Delete the index and re-apply its derived mapping.
    pub async fn reindex(&self, index: &str) -> Result<(), SyncError> {
        let schema = self
            .schemas
            .get(index)
            .ok_or_else(|| SyncError::UnknownModel(index.to_string()))?;
        self.provider.delete_index(index).await?;
        self.provider.put_mapping(index, schema).await?;
        info!(index = %index, "Recreated index with derived mapping");
        Ok(())
    }

    async fn index_drifted(&self, index: &str) -> Result<bool, SyncError> {
        if !self.provider.exists(index).await? {
            return Ok(true);
        }
        let live = self.provider.get_mapping(index).await?;
        let derived = self.derived_mappings(index)?;
        Ok(!mappings_equivalent(live.as_ref(), Some(&derived)))
    }

    fn derived_mappings(&self, index: &str) -> Result<Value, SyncError> {
        let schema = self
            .schemas
            .get(index)
            .ok_or_else(|| SyncError::UnknownModel(index.to_string()))?;
        let schema: Value = serde_json::from_str(schema)
            .map_err(|e| SyncError::config(format!("invalid derived schema for {index}: {e}")))?;
        Ok(schema.get("mappings").cloned().unwrap_or(Value::Null))
    }
}
