//! Per-table change-stream watcher.
//!
//! One watcher follows one table's change stream and mirrors each event into
//! bulk writes. Transport failures reopen the stream with backoff, preceded
//! by a catch-up backfill so events missed while disconnected are recovered.
//! The stop channel ends the watcher cooperatively; a watcher that exhausts
//! its retry window returns the error to its supervisor.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tracing::{debug, error, info, warn};

use crate::backfill::Backfiller;
use crate::errors::SyncError;
use table_sync_repository::bulk::{document_request, DocumentWrite};
use table_sync_repository::errors::StoreError;
use table_sync_repository::interfaces::{ChangeStream, DocumentStore, SearchIndexProvider};
use table_sync_shared::{ChangeEvent, ModelDescriptor, ModelRegistry, Parent};

/// Reconnect attempts per failure episode. With the 50 ms doubling schedule
/// capped at 5 s this bounds an episode to roughly fifteen seconds of
/// cumulative delay.
const MAX_RETRIES_PER_EPISODE: usize = 9;

/// Reconnect backoff: 50 ms doubling, capped at 5 s per delay, jittered.
fn retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(25)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(MAX_RETRIES_PER_EPISODE)
}

/// Follows one table's change stream.
pub struct TableWatcher {
    model: ModelDescriptor,
    registry: Arc<ModelRegistry>,
    provider: Arc<dyn SearchIndexProvider>,
    store: Arc<dyn DocumentStore>,
    backfiller: Backfiller,
    stop: broadcast::Receiver<()>,
}

impl TableWatcher {
    pub fn new(
        model: ModelDescriptor,
        registry: Arc<ModelRegistry>,
        provider: Arc<dyn SearchIndexProvider>,
        store: Arc<dyn DocumentStore>,
        backfiller: Backfiller,
        stop: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            model,
            registry,
            provider,
            store,
            backfiller,
            stop,
        }
    }

    /// Run until the stop signal fires or the retry window is exhausted.
    ///
    /// The first connection attempt does not backfill (reconciliation just
    /// did); every reconnect after a failure backfills before streaming
    /// resumes, so events missed while disconnected are re-emitted.
    pub async fn run(self) -> Result<(), SyncError> {
        let TableWatcher {
            model,
            registry,
            provider,
            store,
            backfiller,
            mut stop,
        } = self;

        let doc_name = model.document_name().to_string();
        let parents: Vec<Parent> = registry.parents(&doc_name).to_vec();
        let has_children = registry.has_children(&doc_name);
        let mut strategy = retry_strategy();
        let mut reconnecting = false;

        loop {
            if stop_requested(&mut stop) {
                info!(model = %doc_name, "Stop observed before opening change stream");
                return Ok(());
            }

            if reconnecting {
                if let Err(e) = backfiller.backfill(&model).await {
                    warn!(model = %doc_name, error = %e, "Catch-up backfill failed");
                }
            }

            let mut stream: ChangeStream = match store.changes(&model.table).await {
                Ok(stream) => stream,
                Err(e) => {
                    reconnecting = true;
                    match strategy.next() {
                        Some(delay) => {
                            warn!(
                                model = %doc_name,
                                error = %e,
                                delay = ?delay,
                                "Failed to open change stream, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        None => {
                            error!(model = %doc_name, error = %e, "Change stream retry window exhausted");
                            return Err(e.into());
                        }
                    }
                }
            };

            info!(model = %doc_name, table = %model.table, "Streaming changes");
            let mut healthy = false;

            let failure = loop {
                tokio::select! {
                    _ = stop.recv() => {
                        info!(model = %doc_name, "Stop observed, closing change stream");
                        return Ok(());
                    }
                    next = stream.next() => match next {
                        Some(Ok(event)) => {
                            healthy = true;
                            apply_event(&provider, event, &model.table, &doc_name, &parents, has_children);
                        }
                        Some(Err(e)) => break SyncError::Store(e),
                        None => break SyncError::Store(StoreError::stream(
                            "change stream closed by the transport",
                        )),
                    }
                }
            };

            drop(stream);
            reconnecting = true;
            if healthy {
                // The episode made progress; the next one gets a fresh window.
                strategy = retry_strategy();
            }
            match strategy.next() {
                Some(delay) => {
                    warn!(
                        model = %doc_name,
                        error = %failure,
                        delay = ?delay,
                        "Change stream failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!(model = %doc_name, error = %failure, "Change stream retry window exhausted");
                    return Err(failure);
                }
            }
        }
    }
}

fn stop_requested(stop: &mut broadcast::Receiver<()>) -> bool {
    match stop.try_recv() {
        Ok(()) => true,
        Err(broadcast::error::TryRecvError::Empty) => false,
        // Lagged or closed both mean a stop was signalled or the manager is
        // gone.
        Err(_) => true,
    }
}

/// Mirror one change event into bulk writes. The write runs on its own task
/// so a slow bulk call cannot stall the stream; failures are logged and the
/// stream continues.
fn apply_event(
    provider: &Arc<dyn SearchIndexProvider>,
    event: ChangeEvent,
    index: &str,
    doc_name: &str,
    parents: &[Parent],
    has_children: bool,
) {
    let actions = match &event {
        ChangeEvent::Created { value } => {
            document_request(DocumentWrite::Create(value), index, doc_name, parents, has_children)
        }
        ChangeEvent::Updated { value, changed } => match changed {
            Some(changed) => document_request(
                DocumentWrite::Update {
                    document: value,
                    changed,
                },
                index,
                doc_name,
                parents,
                has_children,
            ),
            // No diff from the store: re-index the full document.
            None => document_request(
                DocumentWrite::Create(value),
                index,
                doc_name,
                parents,
                has_children,
            ),
        },
        ChangeEvent::Deleted { value: Some(value) } => {
            document_request(DocumentWrite::Delete(value), index, doc_name, parents, has_children)
        }
        ChangeEvent::Deleted { value: None } => {
            debug!(model = %doc_name, "Skipping tombstone without a document");
            return;
        }
    };

    match actions {
        Ok(actions) if actions.is_empty() => {}
        Ok(actions) => {
            let provider = Arc::clone(provider);
            let model = doc_name.to_string();
            tokio::spawn(async move {
                if let Err(e) = provider.bulk(actions).await {
                    error!(model = %model, error = %e, "Bulk write for change event failed");
                }
            });
        }
        Err(e) => {
            error!(model = %doc_name, error = %e, "Skipping change event");
        }
    }
}
