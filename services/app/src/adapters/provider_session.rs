//! services/app/src/adapters/provider_session.rs
//!
//! In-process stand-in for the third-party sign-in client. Its session is
//! separate from the auth provider's and has to be revoked on its own.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use todo_sync_core::ports::{PortError, PortResult, ProviderSessionClient};
use tracing::debug;

#[derive(Default)]
struct SessionInner {
    active: bool,
    revocations: usize,
    sign_out_failure: Option<PortError>,
}

#[derive(Clone, Default)]
pub struct InMemoryProviderSession {
    inner: Arc<Mutex<SessionInner>>,
}

impl InMemoryProviderSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the third-party session as started, as the external sign-in
    /// flow does before it hands out a credential.
    pub fn sign_in(&self) {
        self.lock().active = true;
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// How many times the session has been revoked.
    pub fn revocations(&self) -> usize {
        self.lock().revocations
    }

    /// Makes every following `sign_out` fail with `error`, or succeed again with `None`.
    pub fn fail_sign_out(&self, error: Option<PortError>) {
        self.lock().sign_out_failure = error;
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProviderSessionClient for InMemoryProviderSession {
    async fn sign_out(&self) -> PortResult<()> {
        let mut inner = self.lock();
        if let Some(error) = &inner.sign_out_failure {
            return Err(error.clone());
        }
        inner.active = false;
        inner.revocations += 1;
        debug!("Provider session revoked.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_out_revokes() {
        let session = InMemoryProviderSession::new();
        session.sign_in();
        assert!(session.is_active());

        session.sign_out().await.unwrap();
        assert!(!session.is_active());
        assert_eq!(session.revocations(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_keeps_session() {
        let session = InMemoryProviderSession::new();
        session.sign_in();
        session.fail_sign_out(Some(PortError::Unavailable("offline".to_string())));

        assert!(session.sign_out().await.is_err());
        assert!(session.is_active());
        assert_eq!(session.revocations(), 0);
    }
}
