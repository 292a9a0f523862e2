pub mod domain;
pub mod error;
pub mod ports;
pub mod response;
pub mod session;
pub mod todos;

pub use domain::{
    AuthMethod, CredentialCacheEntry, Document, FieldFilter, Identity, OwnerRecord,
    ProviderCredential, ProviderSignIn, Todo,
};
pub use error::{CoreError, CoreResult, Precondition};
pub use ports::{
    AuthProvider, CredentialCache, DocumentStore, PortError, PortResult, ProviderSessionClient,
    SnapshotStream,
};
pub use response::Response;
pub use session::SessionManager;
pub use todos::{TodoSubscription, TodoSynchronizer};
