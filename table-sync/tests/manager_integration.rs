//! Integration tests for the table manager.
//!
//! These tests drive the real manager, reconciler, backfiller and watchers
//! against the in-memory document store and a recording mock of the search
//! provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;
use tokio::time::timeout;

use table_sync::backfill::Backfiller;
use table_sync::manager::TableManager;
use table_sync::watcher::TableWatcher;
use table_sync_repository::bulk::{BulkAction, BulkOp};
use table_sync_repository::errors::{SearchIndexError, StoreError};
use table_sync_repository::interfaces::{
    ChangeStream, DocumentStore, DocumentStream, SearchIndexProvider,
};
use table_sync_repository::memory::MemoryStore;
use table_sync_repository::schema::build_schema;
use table_sync_shared::{Attribute, ChangeEvent, Document, ModelDescriptor, ModelRegistry};

// Mock search provider that applies bulk actions to in-memory indices.

#[derive(Default)]
struct MockIndex {
    mappings: Value,
    docs: HashMap<String, Value>,
}

#[derive(Default)]
struct MockSearchProvider {
    indices: Mutex<HashMap<String, MockIndex>>,
    put_count: AtomicUsize,
}

impl MockSearchProvider {
    fn new() -> Self {
        Self::default()
    }

    fn with_index(self, index: &str, mappings: Value) -> Self {
        self.indices.lock().unwrap().insert(
            index.to_string(),
            MockIndex {
                mappings,
                docs: HashMap::new(),
            },
        );
        self
    }

    fn count(&self, index: &str) -> usize {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .map(|state| state.docs.len())
            .unwrap_or(0)
    }

    fn doc(&self, index: &str, id: &str) -> Option<Value> {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .and_then(|state| state.docs.get(id).cloned())
    }

    fn mappings(&self, index: &str) -> Option<Value> {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .map(|state| state.mappings.clone())
    }

    fn puts(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndexProvider for MockSearchProvider {
    async fn exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        Ok(self.indices.lock().unwrap().contains_key(index))
    }

    async fn delete_index(&self, index: &str) -> Result<bool, SearchIndexError> {
        Ok(self.indices.lock().unwrap().remove(index).is_some())
    }

    async fn get_mapping(&self, index: &str) -> Result<Option<Value>, SearchIndexError> {
        Ok(self.mappings(index))
    }

    async fn put_mapping(&self, index: &str, schema: &str) -> Result<(), SearchIndexError> {
        let schema: Value = serde_json::from_str(schema)
            .map_err(|e| SearchIndexError::serialization(e.to_string()))?;
        self.indices.lock().unwrap().insert(
            index.to_string(),
            MockIndex {
                mappings: schema["mappings"].clone(),
                docs: HashMap::new(),
            },
        );
        self.put_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn bulk(&self, actions: Vec<BulkAction>) -> Result<(), SearchIndexError> {
        let mut indices = self.indices.lock().unwrap();
        for action in actions {
            let state = indices.entry(action.index.clone()).or_default();
            match action.op {
                BulkOp::Create => {
                    state
                        .docs
                        .insert(action.id, action.source.unwrap_or(Value::Null));
                }
                BulkOp::Update => {
                    let partial = action.source.unwrap_or(Value::Null);
                    let partial = partial["doc"].as_object().cloned().unwrap_or_default();
                    let entry = state
                        .docs
                        .entry(action.id)
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(existing) = entry {
                        for (key, value) in partial {
                            existing.insert(key, value);
                        }
                    } else {
                        *entry = Value::Object(partial);
                    }
                }
                BulkOp::Delete => {
                    state.docs.remove(&action.id);
                }
            }
        }
        Ok(())
    }

    async fn empty(&self, targets: Option<&[String]>) -> Result<bool, SearchIndexError> {
        let mut indices = self.indices.lock().unwrap();
        match targets {
            Some(names) => {
                for name in names {
                    if let Some(state) = indices.get_mut(name) {
                        state.docs.clear();
                    }
                }
            }
            None => {
                for state in indices.values_mut() {
                    state.docs.clear();
                }
            }
        }
        Ok(true)
    }
}

// Document store whose change stream fails a configurable number of times
// before delegating to the in-memory store.

struct FlakyStore {
    inner: MemoryStore,
    change_failures: AtomicUsize,
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn iterate_all(&self, table: &str) -> Result<DocumentStream, StoreError> {
        self.inner.iterate_all(table).await
    }

    async fn changes(&self, table: &str) -> Result<ChangeStream, StoreError> {
        if self.change_failures.load(Ordering::SeqCst) > 0 {
            self.change_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::connection("change stream unavailable"));
        }
        self.inner.changes(table).await
    }
}

// Shared fixtures.

fn models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new(
            "Programmer",
            "programmers",
            vec![
                Attribute::new("id", "string").with_es_type("keyword"),
                Attribute::new("name", "string"),
            ],
        ),
        ModelDescriptor::new(
            "Migraine",
            "migraines",
            vec![
                Attribute::new("id", "string").with_es_type("keyword"),
                Attribute::new("severity", "i32"),
                Attribute::new("programmer_id", "string").with_parent("Programmer"),
            ],
        ),
    ]
}

fn derived_mappings(document_name: &str) -> Value {
    let registry = ModelRegistry::new(models()).unwrap();
    let schema = build_schema(registry.get(document_name).unwrap(), &registry).unwrap();
    let schema: Value = serde_json::from_str(&schema).unwrap();
    schema["mappings"].clone()
}

fn programmer(id: &str, name: &str) -> Document {
    Document::from_value(json!({ "id": id, "name": name })).unwrap()
}

fn migraine(id: &str, programmer_id: &str) -> Document {
    Document::from_value(json!({ "id": id, "severity": 7, "programmer_id": programmer_id }))
        .unwrap()
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within two seconds");
}

#[tokio::test]
async fn test_startup_creates_indices_and_backfills() {
    let provider = Arc::new(MockSearchProvider::new());
    let store = Arc::new(MemoryStore::new());
    store.seed(
        "programmers",
        (0..5).map(|n| programmer(&format!("P{n}"), "Ada")).collect(),
    );

    TableManager::start(models(), provider.clone(), store.clone(), true, false)
        .await
        .unwrap();

    assert!(provider.mappings("programmers").is_some());
    assert!(provider.mappings("migraines").is_some());
    assert_eq!(
        provider.mappings("programmers").unwrap(),
        derived_mappings("Programmer")
    );
    assert_eq!(provider.count("programmers"), 5);
    assert_eq!(provider.count("migraines"), 0);

    // Backfilled parents carry the discriminator and the parent join form.
    let doc = provider.doc("programmers", "P0").unwrap();
    assert_eq!(doc["type"], "Programmer");
    assert_eq!(doc["join"], "Programmer");
}

#[tokio::test]
async fn test_reconcile_recreates_drifted_index() {
    let provider = Arc::new(
        MockSearchProvider::new()
            .with_index(
                "programmers",
                json!({ "properties": { "wrong": { "type": "keyword" } } }),
            )
            .with_index("migraines", derived_mappings("Migraine")),
    );
    let store = Arc::new(MemoryStore::new());

    TableManager::start(models(), provider.clone(), store, false, false)
        .await
        .unwrap();

    assert_eq!(
        provider.mappings("programmers").unwrap(),
        derived_mappings("Programmer")
    );
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let provider = Arc::new(MockSearchProvider::new());
    let store = Arc::new(MemoryStore::new());

    TableManager::start(models(), provider.clone(), store.clone(), false, false)
        .await
        .unwrap();
    assert_eq!(provider.puts(), 2);

    TableManager::start(models(), provider.clone(), store, false, false)
        .await
        .unwrap();
    assert_eq!(provider.puts(), 2);
}

#[tokio::test]
async fn test_backfill_restores_emptied_index() {
    let provider = Arc::new(MockSearchProvider::new());
    let store = Arc::new(MemoryStore::new());
    store.seed(
        "programmers",
        (0..5).map(|n| programmer(&format!("P{n}"), "Ada")).collect(),
    );

    let manager = TableManager::start(models(), provider.clone(), store, true, false)
        .await
        .unwrap();
    assert_eq!(provider.count("programmers"), 5);

    provider
        .empty(Some(&["programmers".to_string()]))
        .await
        .unwrap();
    assert_eq!(provider.count("programmers"), 0);

    manager.backfill("Programmer").await.unwrap();
    assert_eq!(provider.count("programmers"), 5);
}

#[tokio::test]
async fn test_live_sync_follows_creates_updates_and_deletes() {
    let provider = Arc::new(MockSearchProvider::new());
    let store = Arc::new(MemoryStore::new());

    let manager = TableManager::start(models(), provider.clone(), store.clone(), false, true)
        .await
        .unwrap();

    // Both watchers must have their streams open before mutating.
    let subscribed = store.clone();
    wait_for(move || {
        subscribed.subscriber_count("programmers") == 1
            && subscribed.subscriber_count("migraines") == 1
    })
    .await;

    store.create("programmers", programmer("P1", "Ada"));
    let counted = provider.clone();
    wait_for(move || counted.count("programmers") == 1).await;

    store.update(
        "programmers",
        programmer("P1", "Grace"),
        Some(Document::from_value(json!({ "name": "Grace" })).unwrap()),
    );
    let updated = provider.clone();
    wait_for(move || {
        updated.doc("programmers", "P1").map(|doc| doc["name"].clone()) == Some(json!("Grace"))
    })
    .await;

    // A child document fans out into its parent's index with child routing.
    store.create("migraines", migraine("M1", "P1"));
    let fanned = provider.clone();
    wait_for(move || fanned.count("migraines") == 1).await;
    let fanned = provider.clone();
    wait_for(move || fanned.doc("programmers", "M1").is_some()).await;
    assert_eq!(
        provider.doc("programmers", "M1").unwrap()["join"],
        json!({ "name": "Migraine", "parent": "P1" })
    );

    store.delete("programmers", "P1");
    let counted = provider.clone();
    wait_for(move || counted.doc("programmers", "P1").is_none()).await;

    // After stop, further mutations no longer reach the search cluster.
    // Tombstone probes are skipped by watchers but flush closed streams out
    // of the subscriber list once the watchers have exited.
    manager.stop();
    let stopped = store.clone();
    wait_for(move || {
        stopped.emit("programmers", ChangeEvent::Deleted { value: None });
        stopped.subscriber_count("programmers") == 0
    })
    .await;

    store.create("programmers", programmer("P2", "Edsger"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(provider.doc("programmers", "P2").is_none());
}

#[tokio::test]
async fn test_watcher_backfills_on_reconnect() {
    let provider = Arc::new(MockSearchProvider::new());
    let memory = MemoryStore::new();
    memory.seed(
        "programmers",
        (0..3).map(|n| programmer(&format!("P{n}"), "Ada")).collect(),
    );
    let store = Arc::new(FlakyStore {
        inner: memory.clone(),
        change_failures: AtomicUsize::new(1),
    });

    let registry = Arc::new(ModelRegistry::new(models()).unwrap());
    let backfiller = Backfiller::new(registry.clone(), provider.clone(), store.clone());
    let (stop_tx, stop_rx) = broadcast::channel(1);

    let watcher = TableWatcher::new(
        registry.get("Programmer").unwrap().clone(),
        registry.clone(),
        provider.clone(),
        store,
        backfiller,
        stop_rx,
    );
    let handle = tokio::spawn(watcher.run());

    // The failed first attempt forces a catch-up backfill before streaming.
    let counted = provider.clone();
    wait_for(move || counted.count("programmers") == 3).await;

    let subscribed = memory.clone();
    wait_for(move || subscribed.subscriber_count("programmers") == 1).await;
    memory.create("programmers", programmer("P9", "Grace"));
    let counted = provider.clone();
    wait_for(move || counted.count("programmers") == 4).await;

    stop_tx.send(()).unwrap();
    let result = timeout(Duration::from_secs(2), handle).await.unwrap();
    assert!(result.unwrap().is_ok());
}
