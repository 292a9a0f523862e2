//! services/app/src/bin/app.rs

use std::sync::Arc;
use todo_app_lib::{
    config::Config,
    error::AppError,
    presenters::{next_outcome, AuthPresenter, ProfilePresenter, TodoPresenter},
    state::AppState,
};
use todo_sync_core::{CoreError, PortError, Response, Todo};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting session...");

    // --- 2. Wire the Backend ---
    let app_state = AppState::in_memory(config.clone()).await?;

    // --- 3. Authenticate ---
    let auth = AuthPresenter::new(app_state.session.clone());
    let mut outcomes = auth.email_outcomes();
    auth.sign_up(&config.demo_email, &config.demo_password);
    match next_outcome(&mut outcomes).await? {
        Response::Success(_) => info!("Signed up as {}", config.demo_email),
        Response::Error(Some(CoreError::AuthFailure(PortError::AlreadyExists(_)))) => {
            auth.sign_in(&config.demo_email, &config.demo_password);
            expect_success(next_outcome(&mut outcomes).await?, "sign in")?;
            info!("Signed in as {}", config.demo_email);
        }
        other => expect_success(other, "sign up")?,
    }

    // --- 4. Work the List ---
    let todos = TodoPresenter::start(app_state.todos.clone());
    log_snapshot(&todos.wait_for(|s| s.is_terminal()).await?);

    for item in &config.demo_items {
        todos.insert(item);
    }
    let expected = config.demo_items.len();
    let snapshot = todos
        .wait_for(|s| s.success().is_some_and(|list| list.len() >= expected))
        .await?;
    log_snapshot(&snapshot);

    if let Some(first) = snapshot.success().and_then(|list| list.first()).cloned() {
        let done = Todo {
            done: true,
            ..first.clone()
        };
        todos.update(done);
        log_snapshot(
            &todos
                .wait_for(|s| {
                    s.success()
                        .is_some_and(|list| list.iter().any(|t| t.id == first.id && t.done))
                })
                .await?,
        );

        todos.delete(&first.id);
        log_snapshot(
            &todos
                .wait_for(|s| {
                    s.success()
                        .is_some_and(|list| list.iter().all(|t| t.id != first.id))
                })
                .await?,
        );
    }
    todos.shutdown();

    // --- 5. Sign Out ---
    let profile = ProfilePresenter::new(app_state.session.clone());
    let mut profile_outcomes = profile.outcomes();
    profile.sign_out();
    expect_success(next_outcome(&mut profile_outcomes).await?, "sign out")?;
    info!("Session ended.");

    Ok(())
}

fn expect_success(outcome: Response<bool>, operation: &str) -> Result<(), AppError> {
    match outcome {
        Response::Success(_) => Ok(()),
        Response::Error(Some(e)) => Err(e.into()),
        Response::Error(None) => Err(AppError::Internal(format!("{} failed", operation))),
        Response::Loading => Err(AppError::Internal(format!("{} never settled", operation))),
    }
}

fn log_snapshot(state: &Response<Vec<Todo>>) {
    match state {
        Response::Loading => info!("Todos loading..."),
        Response::Success(list) if list.is_empty() => info!("No todos."),
        Response::Success(list) => {
            for todo in list {
                info!("[{}] {}", if todo.done { "x" } else { " " }, todo.name);
            }
        }
        Response::Error(cause) => warn!("Todo list unavailable: {:?}", cause),
    }
}
