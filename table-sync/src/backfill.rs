//! Table backfill from the primary store.
//!
//! Streams managed tables out of the primary store and into bounded bulk
//! writes. A failed chunk is logged and the rest proceed: the backfill is
//! idempotent, so operations can simply rerun it.

use std::sync::Arc;

use futures::future::join_all;
use futures::StreamExt;
use tracing::{debug, error, info};

use crate::errors::SyncError;
use table_sync_repository::bulk::{document_request, DocumentWrite};
use table_sync_repository::interfaces::{DocumentStore, SearchIndexProvider};
use table_sync_shared::{ModelDescriptor, ModelRegistry};

/// Documents per bulk request during a backfill.
const BACKFILL_CHUNK_SIZE: usize = 100;

/// Streams managed tables into bulk writes.
#[derive(Clone)]
pub struct Backfiller {
    registry: Arc<ModelRegistry>,
    provider: Arc<dyn SearchIndexProvider>,
    store: Arc<dyn DocumentStore>,
}

impl Backfiller {
    pub fn new(
        registry: Arc<ModelRegistry>,
        provider: Arc<dyn SearchIndexProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            registry,
            provider,
            store,
        }
    }

    /// Backfill every managed table in parallel.
    pub async fn backfill_all(&self) -> Result<(), SyncError> {
        let results = join_all(
            self.registry
                .models()
                .iter()
                .map(|model| self.backfill(model)),
        )
        .await;
        for result in results {
            result?;
        }
        Ok(())
    }

    /// Backfill one table: stream it at majority consistency and post bulk
    /// bodies in bounded, concurrent chunks.
    pub async fn backfill(&self, model: &ModelDescriptor) -> Result<(), SyncError> {
        let doc_name = model.document_name();
        let parents = self.registry.parents(doc_name);
        let has_children = self.registry.has_children(doc_name);
        let doc_name_owned = doc_name.to_string();

        info!(model = %doc_name, table = %model.table, "Backfilling table");

        let stream = self.store.iterate_all(&model.table).await?;
        stream
            .filter_map(move |row| {
                let doc_name = doc_name_owned.clone();
                async move {
                    match row {
                        Ok(document) => Some(document),
                        Err(e) => {
                            error!(
                                model = %doc_name,
                                error = %e,
                                "Skipping undecodable row during backfill"
                            );
                            None
                        }
                    }
                }
            })
            .chunks(BACKFILL_CHUNK_SIZE)
            .for_each_concurrent(None, move |chunk| {
                let chunk_size = chunk.len();
                async move {
                    let mut actions = Vec::new();
                    for document in &chunk {
                        match document_request(
                            DocumentWrite::Create(document),
                            &model.table,
                            doc_name,
                            parents,
                            has_children,
                        ) {
                            Ok(batch) => actions.extend(batch),
                            Err(e) => {
                                error!(
                                    model = %doc_name,
                                    error = %e,
                                    "Skipping document during backfill"
                                );
                            }
                        }
                    }
                    if let Err(e) = self.provider.bulk(actions).await {
                        error!(
                            model = %doc_name,
                            chunk_size,
                            error = %e,
                            "Backfill chunk failed"
                        );
                    } else {
                        debug!(model = %doc_name, chunk_size, "Backfilled chunk");
                    }
                }
            })
            .await;

        Ok(())
    }
}
