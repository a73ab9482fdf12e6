//! Table manager facade.
//!
//! Owns the registry, derived schemas, and the components that keep the
//! search cluster synchronized: reconciler, backfiller, and one watcher per
//! managed table. All shared state is built once at startup and read
//! concurrently thereafter; the stop channel is the only coordination point.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::backfill::Backfiller;
use crate::errors::SyncError;
use crate::reconciler::Reconciler;
use crate::watcher::TableWatcher;
use table_sync_repository::interfaces::{DocumentStore, SearchIndexProvider};
use table_sync_repository::schema::build_schemas;
use table_sync_shared::{ModelDescriptor, ModelRegistry};

/// Orchestrates the managed tables.
pub struct TableManager {
    registry: Arc<ModelRegistry>,
    provider: Arc<dyn SearchIndexProvider>,
    store: Arc<dyn DocumentStore>,
    backfiller: Backfiller,
    reconciler: Reconciler,
    stop: broadcast::Sender<()>,
}

impl TableManager {
    /// Validate the model set, derive schemas, reconcile the cluster, then
    /// optionally backfill and start watchers.
    pub async fn start(
        models: Vec<ModelDescriptor>,
        provider: Arc<dyn SearchIndexProvider>,
        store: Arc<dyn DocumentStore>,
        backfill: bool,
        watch: bool,
    ) -> Result<Arc<Self>, SyncError> {
        let registry = Arc::new(ModelRegistry::new(models)?);
        let schemas = Arc::new(build_schemas(&registry)?);
        let (stop, _) = broadcast::channel(1);

        let backfiller = Backfiller::new(
            Arc::clone(&registry),
            Arc::clone(&provider),
            Arc::clone(&store),
        );
        let reconciler = Reconciler::new(
            Arc::clone(&registry),
            schemas,
            Arc::clone(&provider),
            backfiller.clone(),
        );

        let manager = Arc::new(Self {
            registry,
            provider,
            store,
            backfiller,
            reconciler,
            stop,
        });

        info!(
            models = manager.registry.models().len(),
            backfill, watch, "Starting table manager"
        );
        manager.reconciler.reconcile(backfill).await?;
        if watch {
            manager.watch_tables();
        }
        Ok(manager)
    }

    /// Destructively recreate every managed index.
    pub async fn reindex_all(&self) -> Result<(), SyncError> {
        self.reconciler.reindex_all().await
    }

    /// Destructively recreate one model's index.
    pub async fn reindex(&self, document_name: &str) -> Result<(), SyncError> {
        let model = self.model(document_name)?;
        self.reconciler.reindex(&model.table).await
    }

    /// Backfill every managed table in parallel.
    pub async fn backfill_all(&self) -> Result<(), SyncError> {
        self.backfiller.backfill_all().await
    }

    /// Backfill one managed table.
    pub async fn backfill(&self, document_name: &str) -> Result<(), SyncError> {
        let model = self.model(document_name)?;
        self.backfiller.backfill(model).await
    }

    /// Signal every watcher to stop. Idempotent and safe from any task.
    pub fn stop(&self) {
        // Send only fails when no watcher is listening, which is fine.
        let _ = self.stop.send(());
    }

    /// The managed model set.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Spawn one supervised watcher per managed table. A watcher that
    /// exhausts its retry window takes the process down: a silently stale
    /// index is worse than a crash.
    fn watch_tables(&self) {
        for model in self.registry.models() {
            let watcher = TableWatcher::new(
                model.clone(),
                Arc::clone(&self.registry),
                Arc::clone(&self.provider),
                Arc::clone(&self.store),
                self.backfiller.clone(),
                self.stop.subscribe(),
            );
            let doc_name = model.document_name().to_string();
            tokio::spawn(async move {
                if let Err(e) = watcher.run().await {
                    error!(model = %doc_name, error = %e, "Watcher failed beyond its retry window, exiting");
                    std::process::exit(1);
                }
            });
        }
    }

    fn model(&self, document_name: &str) -> Result<&ModelDescriptor, SyncError> {
        self.registry
            .get(document_name)
            .ok_or_else(|| SyncError::UnknownModel(document_name.to_string()))
    }
}
