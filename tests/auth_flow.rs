mod common;

use std::sync::atomic::Ordering;

use axum::http::Method;
use certconsole::AppError;
use certconsole::models::session::{LoginState, SessionPhase};
use certconsole::repositories::token::MemoryTokenStore;
use certconsole::routes::{self, Navigation, Route};
use common::{ALICE_TOKEN, MockBackend};

#[tokio::test]
async fn test_wrong_password_leaves_session_signed_out() {
    let backend = MockBackend::start().await;
    let (state, store) = backend.state();

    let err = state.auth.login("alice", "wrong").await.unwrap_err();

    assert!(matches!(err, AppError::Authentication(ref msg) if msg == "Bad credentials"));
    let session = state.session.snapshot();
    assert!(!session.is_authenticated);
    assert!(!session.is_loading);
    assert!(session.token.is_none());
    assert_eq!(session.error(), Some("Bad credentials"));
    assert!(store.stored().is_none());
}

#[tokio::test]
async fn test_blank_credentials_never_reach_the_backend() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.state();

    let err = state.auth.login("", "secret").await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(matches!(state.session.snapshot().login, LoginState::Failed(_)));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_login_stores_token_and_profile() {
    let backend = MockBackend::start().await;
    let (state, store) = backend.state();

    let user = state.auth.login("alice", "secret").await.unwrap();

    assert_eq!(user.username, "alice");
    let session = state.session.snapshot();
    assert_eq!(session.phase(), SessionPhase::Authenticated);
    assert_eq!(session.login, LoginState::Succeeded);
    assert_eq!(store.stored().as_deref(), Some(ALICE_TOKEN));

    // The raw token, no scheme.
    let me = backend.requests_to(Method::GET, "/api/users/me");
    assert_eq!(me.len(), 1);
    assert_eq!(me[0].authorization.as_deref(), Some(ALICE_TOKEN));
    let login = backend.requests_to(Method::POST, "/api/auth/login");
    assert_eq!(login[0].authorization, None);
    assert_eq!(login[0].body["username"], "alice");
}

#[tokio::test]
async fn test_ok_answer_without_token_is_a_failed_login() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.state();

    let err = state.auth.login("ghost", "whatever").await.unwrap_err();

    assert_eq!(err.user_message(), "Account suspended");
    assert_eq!(state.session.snapshot().error(), Some("Account suspended"));
}

#[tokio::test]
async fn test_profile_failure_after_login_drops_the_token() {
    let backend = MockBackend::start().await;
    backend.behaviour().profile_fails.store(true, Ordering::SeqCst);
    let (state, store) = backend.state();

    let err = state.auth.login("alice", "secret").await.unwrap_err();

    assert_eq!(err.user_message(), "Profile store down");
    assert!(state.session.snapshot().token.is_none());
    assert!(store.stored().is_none());
}

#[tokio::test]
async fn test_later_unauthorized_answer_signs_out() {
    let backend = MockBackend::start().await;
    let (state, store) = backend.signed_in("alice", "secret").await;
    backend.behaviour().revoke_all.store(true, Ordering::SeqCst);

    let mut page = state.certificates_page();
    page.open().await;

    let session = state.session.snapshot();
    assert!(!session.is_authenticated);
    assert!(session.token.is_none());
    assert!(store.stored().is_none());
    assert!(page.error().is_some());
    assert_eq!(
        routes::resolve(&session, routes::DEFAULT_AUTHENTICATED_PATH).0,
        Navigation::Render(Route::Login)
    );
}

#[tokio::test]
async fn test_logout_clears_even_when_backend_fails() {
    let backend = MockBackend::start().await;
    let (state, store) = backend.signed_in("alice", "secret").await;
    backend.behaviour().logout_fails.store(true, Ordering::SeqCst);

    state.auth.logout().await;

    assert_eq!(backend.requests_to(Method::POST, "/api/auth/logout").len(), 1);
    assert_eq!(state.session.snapshot().phase(), SessionPhase::Unauthenticated);
    assert!(store.stored().is_none());
}

#[tokio::test]
async fn test_restored_token_is_verified() {
    let backend = MockBackend::start().await;

    let (state, _) = backend.state_with(MemoryTokenStore::with_token(ALICE_TOKEN));
    assert_eq!(state.session.snapshot().phase(), SessionPhase::Loading);
    assert!(state.auth.restore().await);
    assert_eq!(state.session.snapshot().role().map(|r| r.as_str()), Some("ADMIN"));

    let (state, store) = backend.state_with(MemoryTokenStore::with_token("stale"));
    assert!(!state.auth.check_auth_status().await);
    let session = state.session.snapshot();
    assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    assert_eq!(session.error(), None);
    assert!(store.stored().is_none());
}

#[tokio::test]
async fn test_user_role_cannot_open_user_management() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("bob", "hunter2").await;
    let session = state.session.snapshot();

    let (navigation, _) = routes::resolve(&session, routes::USERS_MANAGEMENT_PATH);
    assert_eq!(navigation, Navigation::Render(Route::Certificates));
    assert!(
        routes::menu(&session)
            .iter()
            .all(|item| item.path != routes::USERS_MANAGEMENT_PATH)
    );
}
