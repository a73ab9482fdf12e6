//! Primary-store interface consumed by the backfiller and watchers.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::errors::StoreError;
use table_sync_shared::{ChangeEvent, Document};

/// Stream of full table contents.
pub type DocumentStream = BoxStream<'static, Result<Document, StoreError>>;

/// Stream of change events for one table.
pub type ChangeStream = BoxStream<'static, Result<ChangeEvent, StoreError>>;

/// The two capabilities the pipeline needs from the primary store.
///
/// `iterate_all` must read at majority consistency so a backfill reflects
/// every acknowledged write. `changes` yields events until the stream is
/// dropped or the transport fails; a closed stream is a transport failure,
/// not a normal end.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Iterate every row of the named table.
    async fn iterate_all(&self, table: &str) -> Result<DocumentStream, StoreError>;

    /// Open a change stream for the named table.
    async fn changes(&self, table: &str) -> Result<ChangeStream, StoreError>;
}
