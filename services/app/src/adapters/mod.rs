pub mod credential_file;
pub mod memory_auth;
pub mod memory_store;
pub mod provider_session;

pub use credential_file::FileCredentialCache;
pub use memory_auth::InMemoryAuthProvider;
pub use memory_store::InMemoryDocumentStore;
pub use provider_session::InMemoryProviderSession;
