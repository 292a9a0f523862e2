//! services/app/src/presenters/profile.rs
//!
//! Profile screen presenter: shows who is signed in, signs out, deletes the account.

use super::{launch, CHANNEL_CAPACITY};
use std::sync::Arc;
use todo_sync_core::{Identity, Response, SessionManager};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub struct ProfilePresenter {
    session: Arc<SessionManager>,
    outcome_tx: broadcast::Sender<Response<bool>>,
    details: Arc<watch::Sender<Option<Identity>>>,
}

impl ProfilePresenter {
    /// Loads the current identity into `user_details` right away.
    pub fn new(session: Arc<SessionManager>) -> Self {
        let (outcome_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (details, _) = watch::channel(session.current_identity());
        Self {
            session,
            outcome_tx,
            details: Arc::new(details),
        }
    }

    pub fn user_details(&self) -> watch::Receiver<Option<Identity>> {
        self.details.subscribe()
    }

    pub fn outcomes(&self) -> broadcast::Receiver<Response<bool>> {
        self.outcome_tx.subscribe()
    }

    pub fn sign_out(&self) -> JoinHandle<Response<bool>> {
        let session = self.session.clone();
        let details = self.details.clone();
        launch(self.outcome_tx.clone(), async move {
            let outcome = session.sign_out().await;
            details.send_replace(session.current_identity());
            outcome
        })
    }

    pub fn delete_account(&self) -> JoinHandle<Response<bool>> {
        let session = self.session.clone();
        let details = self.details.clone();
        launch(self.outcome_tx.clone(), async move {
            let outcome = session.delete_account().await;
            details.send_replace(session.current_identity());
            outcome
        })
    }
}
