//! services/app/src/adapters/memory_store.rs
//!
//! An in-process document store implementing the `DocumentStore` port.
//!
//! Collections hold JSON documents ordered by id. Live queries are kept in a
//! listener registry: every committed write recomputes each affected
//! listener's result set and pushes it only if it changed. Dropping the
//! stream returned by `listen` removes its registry entry.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use todo_sync_core::ports::{DocumentStore, PortError, PortResult, SnapshotStream};
use todo_sync_core::{Document, FieldFilter};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// Registry State
//=========================================================================================

struct Listener {
    collection: String,
    filter: FieldFilter,
    /// Last result pushed, `None` after an error so the next result is always sent.
    last: Option<Vec<Document>>,
    tx: mpsc::UnboundedSender<PortResult<Vec<Document>>>,
}

#[derive(Default)]
struct StoreInner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    listeners: HashMap<u64, Listener>,
    next_listener_id: u64,
    write_failure: Option<PortError>,
}

impl StoreInner {
    fn check_writable(&self) -> PortResult<()> {
        match &self.write_failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Pushes fresh results to every listener on `collection` whose result changed.
    fn notify(&mut self, collection: &str) {
        let StoreInner {
            collections,
            listeners,
            ..
        } = self;
        for listener in listeners.values_mut() {
            if listener.collection != collection {
                continue;
            }
            let result = matching(collections, collection, &listener.filter);
            if listener.last.as_ref() == Some(&result) {
                continue;
            }
            listener.last = Some(result.clone());
            // A closed receiver is about to deregister itself.
            let _ = listener.tx.send(Ok(result));
        }
    }
}

fn matching(
    collections: &HashMap<String, BTreeMap<String, Value>>,
    collection: &str,
    filter: &FieldFilter,
) -> Vec<Document> {
    collections
        .get(collection)
        .map(|docs| {
            docs.iter()
                .filter(|(_, data)| filter.matches(data))
                .map(|(id, data)| Document::new(id.clone(), data.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Removes a listener from the registry when its stream is dropped.
struct ListenerRegistration {
    id: u64,
    inner: Weak<Mutex<StoreInner>>,
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.listeners.remove(&self.id);
            debug!(listener_id = self.id, "Listener detached.");
        }
    }
}

//=========================================================================================
// The Adapter Struct
//=========================================================================================

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<Mutex<StoreInner>>,
    latency: Duration,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every write by `latency` before it commits, like a round trip would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes every following write fail with `error`, or succeed again with `None`.
    pub fn reject_writes(&self, error: Option<PortError>) {
        self.lock().write_failure = error;
    }

    /// Delivers `error` to every live query on `collection`. Listeners stay
    /// registered and receive a full result again on the next change or on
    /// [`InMemoryDocumentStore::resume_listeners`].
    pub fn fail_listeners(&self, collection: &str, error: PortError) {
        let mut inner = self.lock();
        for listener in inner.listeners.values_mut() {
            if listener.collection == collection {
                listener.last = None;
                let _ = listener.tx.send(Err(error.clone()));
            }
        }
    }

    /// Re-sends current results to listeners on `collection` that last saw an error.
    pub fn resume_listeners(&self, collection: &str) {
        self.lock().notify(collection);
    }

    /// Number of live queries currently registered.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn new_document_id(&self, _collection: &str) -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn get(&self, collection: &str, id: &str) -> PortResult<Option<Document>> {
        let inner = self.lock();
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> PortResult<()> {
        self.round_trip().await;
        let mut inner = self.lock();
        inner.check_writable()?;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        inner.notify(collection);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> PortResult<()> {
        self.round_trip().await;
        let mut inner = self.lock();
        inner.check_writable()?;
        let record = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| PortError::NotFound(format!("{}/{}", collection, id)))?;
        let object = record.as_object_mut().ok_or_else(|| {
            PortError::Malformed(format!("{}/{} is not an object", collection, id))
        })?;
        object.extend(fields);
        inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> PortResult<()> {
        self.round_trip().await;
        let mut inner = self.lock();
        inner.check_writable()?;
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            inner.notify(collection);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, filter: &FieldFilter) -> PortResult<Vec<Document>> {
        Ok(matching(&self.lock().collections, collection, filter))
    }

    fn listen(&self, collection: &str, filter: FieldFilter) -> PortResult<SnapshotStream> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();

        let id = inner.next_listener_id;
        inner.next_listener_id += 1;

        let initial = matching(&inner.collections, collection, &filter);
        tx.send(Ok(initial.clone()))
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        inner.listeners.insert(
            id,
            Listener {
                collection: collection.to_string(),
                filter,
                last: Some(initial),
                tx,
            },
        );
        debug!(listener_id = id, collection, "Listener attached.");

        let registration = ListenerRegistration {
            id,
            inner: Arc::downgrade(&self.inner),
        };
        Ok(stream! {
            let _registration = registration;
            while let Some(result) = rx.recv().await {
                yield result;
            }
        }
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owned(owner: &str, name: &str) -> Value {
        json!({ "name": name, "createdBy": { "userId": owner }, "done": false })
    }

    #[tokio::test]
    async fn test_listen_pushes_initial_and_changed_results() {
        let store = InMemoryDocumentStore::new();
        store.set("todos", "a", owned("u1", "first")).await.unwrap();

        let mut results = store.listen("todos", FieldFilter::owned_by("u1")).unwrap();
        let initial = results.next().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        store.set("todos", "b", owned("u1", "second")).await.unwrap();
        let after = results.next().await.unwrap().unwrap();
        assert_eq!(after.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unrelated_writes_are_not_pushed() {
        let store = InMemoryDocumentStore::new();
        let mut results = store.listen("todos", FieldFilter::owned_by("u1")).unwrap();
        assert!(results.next().await.unwrap().unwrap().is_empty());

        store.set("todos", "x", owned("u2", "theirs")).await.unwrap();
        store.set("todos", "y", owned("u1", "mine")).await.unwrap();

        let next = results.next().await.unwrap().unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, "y");
    }

    #[tokio::test]
    async fn test_dropping_stream_detaches_listener() {
        let store = InMemoryDocumentStore::new();
        let results = store.listen("todos", FieldFilter::owned_by("u1")).unwrap();
        assert_eq!(store.listener_count(), 1);
        drop(results);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_update_merges_fields_and_requires_record() {
        let store = InMemoryDocumentStore::new();
        store.set("todos", "a", owned("u1", "first")).await.unwrap();

        let mut fields = Map::new();
        fields.insert("done".to_string(), json!(true));
        store.update("todos", "a", fields.clone()).await.unwrap();

        let doc = store.get("todos", "a").await.unwrap().unwrap();
        assert_eq!(doc.data["done"], json!(true));
        assert_eq!(doc.data["createdBy"]["userId"], json!("u1"));

        assert!(matches!(
            store.update("todos", "missing", fields).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryDocumentStore::new();
        store.set("users", "u1", json!({ "userId": "u1" })).await.unwrap();
        store.delete("users", "u1").await.unwrap();
        store.delete("users", "u1").await.unwrap();
        assert!(store.get("users", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejected_writes() {
        let store = InMemoryDocumentStore::new();
        store.reject_writes(Some(PortError::Unavailable("offline".to_string())));
        assert!(matches!(
            store.set("todos", "a", owned("u1", "x")).await,
            Err(PortError::Unavailable(_))
        ));
        store.reject_writes(None);
        store.set("todos", "a", owned("u1", "x")).await.unwrap();
    }

    #[tokio::test]
    async fn test_listener_error_then_resume() {
        let store = InMemoryDocumentStore::new();
        store.set("todos", "a", owned("u1", "first")).await.unwrap();
        let mut results = store.listen("todos", FieldFilter::owned_by("u1")).unwrap();
        results.next().await.unwrap().unwrap();

        store.fail_listeners("todos", PortError::Unavailable("blip".to_string()));
        assert!(results.next().await.unwrap().is_err());

        store.resume_listeners("todos");
        assert_eq!(results.next().await.unwrap().unwrap().len(), 1);
    }
}
