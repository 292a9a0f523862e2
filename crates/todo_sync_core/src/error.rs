//! crates/todo_sync_core/src/error.rs
//!
//! Failure taxonomy for the session and live-list operations.

use crate::ports::PortError;

/// A requirement an operation checks before touching any collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Precondition {
    #[error("no authenticated identity")]
    NotAuthenticated,
    #[error("authenticated identity has no email")]
    MissingEmail,
    #[error("no owner record for the authenticated identity")]
    MissingOwnerRecord,
}

/// The primary error type for core operations.
///
/// Each variant names the stage that failed and keeps the collaborator's
/// error as its cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Bad credentials, duplicate account, revoked session.
    #[error("Authentication failed: {0}")]
    AuthFailure(PortError),

    /// The third-party credential was invalid or expired.
    #[error("Provider credential exchange failed: {0}")]
    ProviderExchangeFailure(PortError),

    #[error("Store write failed: {0}")]
    StoreWriteFailure(PortError),

    #[error("Store read failed: {0}")]
    StoreReadFailure(PortError),

    #[error("Live query failed: {0}")]
    StoreListenerFailure(PortError),

    #[error("Credential cache failed: {0}")]
    CredentialCacheFailure(PortError),

    #[error("Precondition failed: {0}")]
    PreconditionFailure(#[from] Precondition),
}

/// A convenience type alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// The collaborator error underneath, if any.
    pub fn port_error(&self) -> Option<&PortError> {
        match self {
            CoreError::AuthFailure(e)
            | CoreError::ProviderExchangeFailure(e)
            | CoreError::StoreWriteFailure(e)
            | CoreError::StoreReadFailure(e)
            | CoreError::StoreListenerFailure(e)
            | CoreError::CredentialCacheFailure(e) => Some(e),
            CoreError::PreconditionFailure(_) => None,
        }
    }
}
