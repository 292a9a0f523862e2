//! services/app/src/presenters/auth.rs
//!
//! Sign-up and sign-in screens' presenter. Email and provider flows publish on
//! separate channels so each screen only sees its own outcomes.

use super::{launch, CHANNEL_CAPACITY};
use std::sync::Arc;
use todo_sync_core::{CoreError, PortResult, ProviderCredential, Response, SessionManager};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub struct AuthPresenter {
    session: Arc<SessionManager>,
    email_tx: broadcast::Sender<Response<bool>>,
    provider_tx: broadcast::Sender<Response<bool>>,
}

impl AuthPresenter {
    pub fn new(session: Arc<SessionManager>) -> Self {
        let (email_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (provider_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            session,
            email_tx,
            provider_tx,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn email_outcomes(&self) -> broadcast::Receiver<Response<bool>> {
        self.email_tx.subscribe()
    }

    pub fn provider_outcomes(&self) -> broadcast::Receiver<Response<bool>> {
        self.provider_tx.subscribe()
    }

    pub fn sign_up(&self, email: &str, password: &str) -> JoinHandle<Response<bool>> {
        let session = self.session.clone();
        let (email, password) = (email.to_string(), password.to_string());
        launch(self.email_tx.clone(), async move {
            session.sign_up(&email, &password).await
        })
    }

    pub fn sign_in(&self, email: &str, password: &str) -> JoinHandle<Response<bool>> {
        let session = self.session.clone();
        let (email, password) = (email.to_string(), password.to_string());
        launch(self.email_tx.clone(), async move {
            session.sign_in(&email, &password).await
        })
    }

    /// Takes the result of the external sign-in flow, which may itself have
    /// failed before a credential was produced.
    pub fn sign_in_with_provider(
        &self,
        credential: PortResult<ProviderCredential>,
    ) -> JoinHandle<Response<bool>> {
        let session = self.session.clone();
        launch(self.provider_tx.clone(), async move {
            match credential {
                Ok(credential) => session.sign_in_with_provider(&credential).await,
                Err(e) => Response::Error(Some(CoreError::ProviderExchangeFailure(e))),
            }
        })
    }
}
