//! Shared fixture: one in-process backend plus the two core components.

#![allow(dead_code)]

use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use todo_app_lib::adapters::{
    FileCredentialCache, InMemoryAuthProvider, InMemoryDocumentStore, InMemoryProviderSession,
};
use todo_sync_core::{SessionManager, TodoSynchronizer};

pub const EMAIL: &str = "a@x.com";
pub const PASSWORD: &str = "pw123";

pub struct Backend {
    pub auth: Arc<InMemoryAuthProvider>,
    pub provider: Arc<InMemoryProviderSession>,
    pub store: Arc<InMemoryDocumentStore>,
    pub credentials: Arc<FileCredentialCache>,
    pub session: Arc<SessionManager>,
    pub todos: Arc<TodoSynchronizer>,
    _dir: TempDir,
}

pub async fn backend() -> Backend {
    let dir = tempfile::tempdir().unwrap();
    let auth = Arc::new(InMemoryAuthProvider::new());
    let provider = Arc::new(InMemoryProviderSession::new());
    let store = Arc::new(InMemoryDocumentStore::new());
    let credentials = Arc::new(
        FileCredentialCache::open(dir.path().join("credentials.json"))
            .await
            .unwrap(),
    );
    let session = Arc::new(SessionManager::new(
        auth.clone(),
        provider.clone(),
        store.clone(),
        credentials.clone(),
    ));
    let todos = Arc::new(TodoSynchronizer::new(auth.clone(), store.clone()));
    Backend {
        auth,
        provider,
        store,
        credentials,
        session,
        todos,
        _dir: dir,
    }
}

/// Next item from a stream, failing the test if nothing arrives promptly.
pub async fn next<S: Stream + Unpin>(stream: &mut S) -> S::Item {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for emission")
        .expect("stream ended")
}

/// Asserts that nothing is emitted for a short while.
pub async fn assert_quiet<S: Stream + Unpin>(stream: &mut S) {
    let waited = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
    assert!(waited.is_err(), "unexpected emission");
}
