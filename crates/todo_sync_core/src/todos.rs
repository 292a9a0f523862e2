//! crates/todo_sync_core/src/todos.rs
//!
//! The Live List Synchronizer. Projects the store's per-owner `todos` query
//! into a stream of full snapshots and forwards mutations to the store.
//! There is no local copy of the list: a mutation shows up only once the
//! store pushes the next snapshot.

use crate::domain::{Document, FieldFilter, OwnerRecord, Todo, TODOS, USERS};
use crate::error::{CoreError, CoreResult, Precondition};
use crate::ports::{AuthProvider, DocumentStore, PortError, PortResult};
use crate::response::Response;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::{Map, Value};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, warn};

pub struct TodoSynchronizer {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn DocumentStore>,
}

impl TodoSynchronizer {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self { auth, store }
    }

    /// Opens a live subscription to the current identity's items.
    ///
    /// The first emission is the list as it stands; each later one is the
    /// complete list after a change by any writer. A listener-level failure
    /// is emitted as `Response::Error` and the subscription stays open.
    pub fn observe(&self) -> CoreResult<TodoSubscription> {
        let identity = self
            .auth
            .current_user()
            .ok_or(Precondition::NotAuthenticated)?;
        let snapshots = self
            .store
            .listen(TODOS, FieldFilter::owned_by(&identity.id))
            .map_err(CoreError::StoreListenerFailure)?;
        debug!(user_id = %identity.id, "Opened todo subscription.");

        Ok(TodoSubscription {
            owner_id: identity.id,
            snapshots: snapshots.map(snapshot_to_response).boxed(),
        })
    }

    /// Writes a new item owned by the current identity.
    pub async fn insert(&self, name: &str) -> CoreResult<()> {
        let identity = self
            .auth
            .current_user()
            .ok_or(Precondition::NotAuthenticated)?;
        let owner: OwnerRecord = self
            .store
            .get(USERS, &identity.id)
            .await
            .map_err(CoreError::StoreReadFailure)?
            .ok_or(Precondition::MissingOwnerRecord)?
            .decode()
            .map_err(|e| CoreError::StoreReadFailure(PortError::Malformed(e.to_string())))?;

        let id = self.store.new_document_id(TODOS);
        let todo = Todo {
            id: id.clone(),
            name: name.to_string(),
            created_by: owner,
            done: false,
        };
        let data = serde_json::to_value(&todo)
            .map_err(|e| CoreError::StoreWriteFailure(PortError::Malformed(e.to_string())))?;
        self.store
            .set(TODOS, &id, data)
            .await
            .map_err(CoreError::StoreWriteFailure)
    }

    /// Writes `name` and `done` onto the stored item. The owner is never rewritten.
    pub async fn update(&self, todo: &Todo) -> CoreResult<()> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::from(todo.name.as_str()));
        fields.insert("done".to_string(), Value::from(todo.done));
        self.store
            .update(TODOS, &todo.id, fields)
            .await
            .map_err(CoreError::StoreWriteFailure)
    }

    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        self.store
            .delete(TODOS, id)
            .await
            .map_err(CoreError::StoreWriteFailure)
    }
}

fn snapshot_to_response(result: PortResult<Vec<Document>>) -> Response<Vec<Todo>> {
    match result {
        Ok(documents) => Response::from_result(documents.iter().map(decode_todo).collect()),
        Err(e) => {
            warn!("Todo listener reported an error: {}", e);
            Response::Error(Some(CoreError::StoreListenerFailure(e)))
        }
    }
}

fn decode_todo(document: &Document) -> CoreResult<Todo> {
    let mut todo: Todo = document.decode().map_err(|e| {
        CoreError::StoreListenerFailure(PortError::Malformed(format!(
            "todo {}: {}",
            document.id, e
        )))
    })?;
    todo.id = document.id.clone();
    Ok(todo)
}

//=========================================================================================
// Subscription Handle
//=========================================================================================

/// A live, cancellable sequence of snapshots for one owner.
///
/// Dropping the handle detaches the remote listener; [`TodoSubscription::cancel`]
/// does the same explicitly.
pub struct TodoSubscription {
    owner_id: String,
    snapshots: BoxStream<'static, Response<Vec<Todo>>>,
}

impl TodoSubscription {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Detaches the remote listener. Nothing is delivered for this
    /// subscription after this returns.
    pub fn cancel(self) {
        debug!(user_id = %self.owner_id, "Cancelled todo subscription.");
    }
}

impl Stream for TodoSubscription {
    type Item = Response<Vec<Todo>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.snapshots.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_takes_id_from_document() {
        let doc = Document::new(
            "abc",
            json!({ "name": "buy milk", "createdBy": { "userId": "u1" }, "done": true }),
        );
        let response = snapshot_to_response(Ok(vec![doc]));
        let todos = response.success().unwrap();
        assert_eq!(todos[0].id, "abc");
        assert!(todos[0].done);
        assert_eq!(todos[0].created_by.user_id, "u1");
    }

    #[test]
    fn test_undecodable_document_becomes_listener_error() {
        let doc = Document::new("bad", json!({ "name": 42 }));
        let response = snapshot_to_response(Ok(vec![doc]));
        assert!(matches!(
            response.error(),
            Some(CoreError::StoreListenerFailure(PortError::Malformed(_)))
        ));
    }

    #[test]
    fn test_listener_error_is_wrapped() {
        let response = snapshot_to_response(Err(PortError::Unavailable("offline".to_string())));
        assert_eq!(
            response.error(),
            Some(&CoreError::StoreListenerFailure(PortError::Unavailable(
                "offline".to_string()
            )))
        );
    }
}
