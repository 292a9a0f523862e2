//! crates/todo_sync_core/src/ports.rs
//!
//! Defines the contracts (traits) for the hosted collaborators the core talks to.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete auth provider, document store and local cache.

use crate::domain::{
    CredentialCacheEntry, Document, FieldFilter, Identity, ProviderCredential, ProviderSignIn,
};
use async_trait::async_trait;
use futures::stream::BoxStream;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, storage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed record: {0}")]
    Malformed(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Push-driven sequence of full result sets from a live query.
///
/// Dropping the stream detaches the listener; no further results are
/// produced for it once the drop has returned.
pub type SnapshotStream = BoxStream<'static, PortResult<Vec<Document>>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Registers a new identity and makes it the current one.
    async fn create_user_with_email(&self, email: &str, password: &str) -> PortResult<Identity>;

    async fn sign_in_with_email(&self, email: &str, password: &str) -> PortResult<Identity>;

    /// Exchanges a third-party credential for a session.
    async fn sign_in_with_credential(
        &self,
        credential: &ProviderCredential,
    ) -> PortResult<ProviderSignIn>;

    /// Confirms the current identity's password before a sensitive operation.
    async fn reauthenticate(&self, email: &str, password: &str) -> PortResult<()>;

    /// Deletes the current identity and ends its session.
    async fn delete_current_user(&self) -> PortResult<()>;

    fn sign_out(&self) -> PortResult<()>;

    fn current_user(&self) -> Option<Identity>;
}

/// The third-party sign-in client whose session outlives the auth provider's.
#[async_trait]
pub trait ProviderSessionClient: Send + Sync {
    async fn sign_out(&self) -> PortResult<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Allocates a fresh, store-assigned id without writing anything.
    fn new_document_id(&self, collection: &str) -> String;

    async fn get(&self, collection: &str, id: &str) -> PortResult<Option<Document>>;

    /// Creates or fully replaces the record.
    async fn set(&self, collection: &str, id: &str, data: serde_json::Value) -> PortResult<()>;

    /// Overwrites only the given top-level fields. Fails with `NotFound` if the
    /// record does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> PortResult<()>;

    /// Removes the record. Removing a missing record succeeds.
    async fn delete(&self, collection: &str, id: &str) -> PortResult<()>;

    async fn query(&self, collection: &str, filter: &FieldFilter) -> PortResult<Vec<Document>>;

    /// Registers a live query. The stream yields the full matching set
    /// immediately and again whenever a change alters it.
    fn listen(&self, collection: &str, filter: FieldFilter) -> PortResult<SnapshotStream>;
}

#[async_trait]
pub trait CredentialCache: Send + Sync {
    /// Writes all three keys as one group.
    async fn save(&self, entry: &CredentialCacheEntry) -> PortResult<()>;

    async fn load(&self) -> PortResult<CredentialCacheEntry>;

    /// The current entry first, then every subsequent write.
    fn changes(&self) -> BoxStream<'static, CredentialCacheEntry>;
}
