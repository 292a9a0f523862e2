//! services/app/src/state.rs
//!
//! The session context: the collaborators and the two core components built on
//! them, created once at startup and handed to every presenter.

use crate::adapters::{
    FileCredentialCache, InMemoryAuthProvider, InMemoryDocumentStore, InMemoryProviderSession,
};
use crate::config::Config;
use crate::error::AppError;
use std::sync::Arc;
use todo_sync_core::ports::{AuthProvider, CredentialCache, DocumentStore, ProviderSessionClient};
use todo_sync_core::{SessionManager, TodoSynchronizer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<dyn CredentialCache>,
    pub session: Arc<SessionManager>,
    pub todos: Arc<TodoSynchronizer>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        auth: Arc<dyn AuthProvider>,
        provider_session: Arc<dyn ProviderSessionClient>,
        store: Arc<dyn DocumentStore>,
        credentials: Arc<dyn CredentialCache>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(
            auth.clone(),
            provider_session,
            store.clone(),
            credentials.clone(),
        ));
        let todos = Arc::new(TodoSynchronizer::new(auth, store));
        Self {
            config,
            credentials,
            session,
            todos,
        }
    }

    /// Wires the in-process backend and the on-disk credential cache.
    pub async fn in_memory(config: Arc<Config>) -> Result<Self, AppError> {
        let store = InMemoryDocumentStore::new().with_latency(config.store_latency);
        let credentials = FileCredentialCache::open(&config.credential_cache_path).await?;
        Ok(Self::new(
            config,
            Arc::new(InMemoryAuthProvider::new()),
            Arc::new(InMemoryProviderSession::new()),
            Arc::new(store),
            Arc::new(credentials),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use todo_sync_core::PortError;
    use tracing::Level;

    fn config_with_cache(path: std::path::PathBuf) -> Arc<Config> {
        Arc::new(Config {
            log_level: Level::INFO,
            credential_cache_path: path,
            store_latency: Duration::ZERO,
            demo_email: "a@x.com".to_string(),
            demo_password: "pw123".to_string(),
            demo_items: vec![],
        })
    }

    #[tokio::test]
    async fn test_cache_file_failures_surface_as_port_errors() {
        let dir = tempfile::tempdir().unwrap();

        let garbled = dir.path().join("credentials.json");
        std::fs::write(&garbled, "not json").unwrap();
        let result = AppState::in_memory(config_with_cache(garbled)).await;
        assert!(matches!(result, Err(AppError::Port(PortError::Malformed(_)))));

        // Reading a directory fails at the OS level.
        let result = AppState::in_memory(config_with_cache(dir.path().to_path_buf())).await;
        assert!(matches!(result, Err(AppError::Port(PortError::Unavailable(_)))));
    }

    #[tokio::test]
    async fn test_fresh_cache_starts_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(config_with_cache(dir.path().join("credentials.json")))
            .await
            .unwrap();
        assert!(!state.session.is_authenticated());
        assert!(state.credentials.load().await.unwrap().is_cleared());
    }
}
