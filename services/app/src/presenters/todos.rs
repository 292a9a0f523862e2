//! services/app/src/presenters/todos.rs
//!
//! The list screen presenter. Holds the latest snapshot in a watch channel fed
//! by a background task that owns the live subscription.

use crate::error::AppError;
use futures::StreamExt;
use std::sync::Arc;
use todo_sync_core::{Response, Todo, TodoSubscription, TodoSynchronizer};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub type TodoState = Response<Vec<Todo>>;

pub struct TodoPresenter {
    synchronizer: Arc<TodoSynchronizer>,
    state: Arc<watch::Sender<TodoState>>,
    /// Stops the collector task and, with it, the subscription.
    cancellation_token: CancellationToken,
}

impl TodoPresenter {
    /// Publishes `Loading` and starts collecting snapshots. If the
    /// subscription cannot be opened the state becomes `Error` instead.
    pub fn start(synchronizer: Arc<TodoSynchronizer>) -> Self {
        let (state, _) = watch::channel(Response::Loading);
        let state = Arc::new(state);
        let cancellation_token = CancellationToken::new();

        match synchronizer.observe() {
            Ok(subscription) => {
                tokio::spawn(collect_snapshots(
                    subscription,
                    state.clone(),
                    cancellation_token.clone(),
                ));
            }
            Err(e) => {
                error!("Failed to open todo subscription: {}", e);
                state.send_replace(Response::Error(Some(e)));
            }
        }

        Self {
            synchronizer,
            state,
            cancellation_token,
        }
    }

    pub fn todos(&self) -> watch::Receiver<TodoState> {
        self.state.subscribe()
    }

    /// Resolves with the first state, current or future, that satisfies `predicate`.
    pub async fn wait_for<P>(&self, mut predicate: P) -> Result<TodoState, AppError>
    where
        P: FnMut(&TodoState) -> bool,
    {
        let mut rx = self.state.subscribe();
        let found = rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| AppError::Internal("todo state closed".to_string()))?;
        Ok(found.clone())
    }

    pub fn insert(&self, name: &str) -> JoinHandle<()> {
        let synchronizer = self.synchronizer.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            if let Err(e) = synchronizer.insert(&name).await {
                error!("Failed to insert todo: {}", e);
            }
        })
    }

    pub fn update(&self, todo: Todo) -> JoinHandle<()> {
        let synchronizer = self.synchronizer.clone();
        tokio::spawn(async move {
            if let Err(e) = synchronizer.update(&todo).await {
                error!(todo_id = %todo.id, "Failed to update todo: {}", e);
            }
        })
    }

    pub fn delete(&self, id: &str) -> JoinHandle<()> {
        let synchronizer = self.synchronizer.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            if let Err(e) = synchronizer.delete(&id).await {
                error!(todo_id = %id, "Failed to delete todo: {}", e);
            }
        })
    }

    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
    }
}

impl Drop for TodoPresenter {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

async fn collect_snapshots(
    mut subscription: TodoSubscription,
    state: Arc<watch::Sender<TodoState>>,
    cancellation_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => break,
            next = subscription.next() => match next {
                Some(response) => {
                    state.send_replace(response);
                }
                None => {
                    info!("Todo subscription ended.");
                    return;
                }
            },
        }
    }
    subscription.cancel();
    info!("Todo collector stopped.");
}
