//! services/app/src/presenters/mod.rs
//!
//! The UI-facing layer. Presenters run core operations as background tasks
//! and publish every outcome as a `Response`, `Loading` first.

pub mod auth;
pub mod profile;
pub mod todos;

pub use auth::AuthPresenter;
pub use profile::ProfilePresenter;
pub use todos::TodoPresenter;

use crate::error::AppError;
use std::future::Future;
use todo_sync_core::Response;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::warn;

/// Buffer for outcome channels; subscribers that fall further behind skip ahead.
const CHANNEL_CAPACITY: usize = 16;

/// Emits `Loading`, runs `operation` on the runtime, then emits its outcome.
fn launch<F>(tx: broadcast::Sender<Response<bool>>, operation: F) -> JoinHandle<Response<bool>>
where
    F: Future<Output = Response<bool>> + Send + 'static,
{
    tokio::spawn(async move {
        // Sending with no subscribers is fine; nobody is waiting on the outcome.
        let _ = tx.send(Response::Loading);
        let outcome = operation.await;
        let _ = tx.send(outcome.clone());
        outcome
    })
}

/// Waits for the next terminal outcome on `rx`, skipping `Loading`.
pub async fn next_outcome(
    rx: &mut broadcast::Receiver<Response<bool>>,
) -> Result<Response<bool>, AppError> {
    loop {
        match rx.recv().await {
            Ok(Response::Loading) => continue,
            Ok(outcome) => return Ok(outcome),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Outcome subscriber lagged behind.");
            }
            Err(RecvError::Closed) => {
                return Err(AppError::Internal("outcome channel closed".to_string()))
            }
        }
    }
}
