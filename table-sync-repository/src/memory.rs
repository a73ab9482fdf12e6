//! In-memory document store for tests and local development.
//!
//! Tables are seeded up front or mutated through `create`/`update`/`delete`,
//! and every mutation is mirrored onto that table's open change streams.
//! Cloning the store clones a handle to the same tables.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::errors::StoreError;
use crate::interfaces::{ChangeStream, DocumentStore, DocumentStream};
use table_sync_shared::{ChangeEvent, Document};

#[derive(Default)]
struct TableState {
    rows: Vec<Document>,
    subscribers: Vec<mpsc::UnboundedSender<ChangeEvent>>,
}

/// An in-process `DocumentStore`.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, TableState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table without emitting change events.
    pub fn seed(&self, table: &str, rows: Vec<Document>) {
        let mut tables = self.tables.lock().unwrap();
        tables.entry(table.to_string()).or_default().rows = rows;
    }

    /// The current rows of a table.
    pub fn rows(&self, table: &str) -> Vec<Document> {
        let tables = self.tables.lock().unwrap();
        tables
            .get(table)
            .map(|state| state.rows.clone())
            .unwrap_or_default()
    }

    /// Insert a row and emit a `Created` event.
    pub fn create(&self, table: &str, document: Document) {
        let mut tables = self.tables.lock().unwrap();
        let state = tables.entry(table.to_string()).or_default();
        state.rows.push(document.clone());
        publish(state, ChangeEvent::Created { value: document });
    }

    /// Replace the row with the same id and emit an `Updated` event carrying
    /// the given diff.
    pub fn update(&self, table: &str, document: Document, changed: Option<Document>) {
        let mut tables = self.tables.lock().unwrap();
        let state = tables.entry(table.to_string()).or_default();
        if let Some(row) = state.rows.iter_mut().find(|row| row.id() == document.id()) {
            *row = document.clone();
        }
        publish(
            state,
            ChangeEvent::Updated {
                value: document,
                changed,
            },
        );
    }

    /// Remove the row with the given id and emit a `Deleted` event carrying
    /// the removed document.
    pub fn delete(&self, table: &str, id: &str) {
        let mut tables = self.tables.lock().unwrap();
        let state = tables.entry(table.to_string()).or_default();
        let position = state.rows.iter().position(|row| row.id() == Some(id));
        let removed = position.map(|position| state.rows.remove(position));
        publish(state, ChangeEvent::Deleted { value: removed });
    }

    /// Push a raw event onto a table's change streams.
    pub fn emit(&self, table: &str, event: ChangeEvent) {
        let mut tables = self.tables.lock().unwrap();
        publish(tables.entry(table.to_string()).or_default(), event);
    }

    /// Number of open change streams on a table.
    pub fn subscriber_count(&self, table: &str) -> usize {
        let tables = self.tables.lock().unwrap();
        tables
            .get(table)
            .map(|state| state.subscribers.len())
            .unwrap_or(0)
    }
}

fn publish(state: &mut TableState, event: ChangeEvent) {
    state
        .subscribers
        .retain(|subscriber| subscriber.send(event.clone()).is_ok());
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn iterate_all(&self, table: &str) -> Result<DocumentStream, StoreError> {
        let rows = self.rows(table);
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn changes(&self, table: &str) -> Result<ChangeStream, StoreError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            let mut tables = self.tables.lock().unwrap();
            tables
                .entry(table.to_string())
                .or_default()
                .subscribers
                .push(sender);
        }
        let stream = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|event| (Ok(event), receiver))
        });
        Ok(stream.boxed())
    }
}
