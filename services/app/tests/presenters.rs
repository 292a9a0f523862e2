mod common;

use common::{backend, EMAIL, PASSWORD};
use todo_app_lib::presenters::{next_outcome, AuthPresenter, ProfilePresenter, TodoPresenter};
use todo_sync_core::{CoreError, PortError, Precondition, Response};

#[tokio::test]
async fn test_auth_emits_loading_then_outcome() {
    let b = backend().await;
    let auth = AuthPresenter::new(b.session.clone());
    let mut outcomes = auth.email_outcomes();

    let handle = auth.sign_up(EMAIL, PASSWORD);
    assert_eq!(outcomes.recv().await.unwrap(), Response::Loading);
    assert_eq!(outcomes.recv().await.unwrap(), Response::Success(true));
    assert_eq!(handle.await.unwrap(), Response::Success(true));
    assert!(auth.is_authenticated());
}

#[tokio::test]
async fn test_failed_provider_flow_reports_exchange_failure() {
    let b = backend().await;
    let auth = AuthPresenter::new(b.session.clone());
    let mut email = auth.email_outcomes();
    let mut provider = auth.provider_outcomes();

    auth.sign_in_with_provider(Err(PortError::Unauthorized("cancelled".to_string())));
    let outcome = next_outcome(&mut provider).await.unwrap();
    assert!(matches!(
        outcome.error(),
        Some(CoreError::ProviderExchangeFailure(_))
    ));
    assert!(email.try_recv().is_err());

    let credential = b.auth.issue_provider_credential("google-1", None);
    auth.sign_in_with_provider(Ok(credential));
    assert_eq!(
        next_outcome(&mut provider).await.unwrap(),
        Response::Success(true)
    );
}

#[tokio::test]
async fn test_todo_presenter_tracks_list() {
    let b = backend().await;
    b.session.sign_up(EMAIL, PASSWORD).await;

    let todos = TodoPresenter::start(b.todos.clone());
    let initial = todos.wait_for(|s| s.is_terminal()).await.unwrap();
    assert_eq!(initial, Response::Success(vec![]));

    todos.insert("buy milk").await.unwrap();
    let state = todos
        .wait_for(|s| s.success().is_some_and(|l| l.len() == 1))
        .await
        .unwrap();
    assert_eq!(state.success().unwrap()[0].name, "buy milk");

    todos.shutdown();
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while b.store.listener_count() > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("listener not detached after shutdown");
}

#[tokio::test]
async fn test_todo_presenter_without_identity() {
    let b = backend().await;
    let todos = TodoPresenter::start(b.todos.clone());
    assert_eq!(
        *todos.todos().borrow(),
        Response::Error(Some(CoreError::PreconditionFailure(
            Precondition::NotAuthenticated
        )))
    );
}

#[tokio::test]
async fn test_profile_sign_out_refreshes_details() {
    let b = backend().await;
    b.session.sign_up(EMAIL, PASSWORD).await;

    let profile = ProfilePresenter::new(b.session.clone());
    let details = profile.user_details();
    assert_eq!(
        details.borrow().as_ref().and_then(|i| i.email.clone()).as_deref(),
        Some(EMAIL)
    );

    let mut outcomes = profile.outcomes();
    profile.sign_out();
    assert_eq!(
        next_outcome(&mut outcomes).await.unwrap(),
        Response::Success(true)
    );
    assert!(details.borrow().is_none());
}

#[tokio::test]
async fn test_profile_delete_account() {
    let b = backend().await;
    b.session.sign_up(EMAIL, PASSWORD).await;
    let identity = b.session.current_identity().unwrap();

    let profile = ProfilePresenter::new(b.session.clone());
    assert_eq!(profile.delete_account().await.unwrap(), Response::Success(true));
    assert!(!b.auth.has_account(&identity.id));
    assert!(profile.user_details().borrow().is_none());
}
