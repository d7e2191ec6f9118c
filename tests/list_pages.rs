mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::Method;
use certconsole::models::certificate::NewCertificate;
use certconsole::models::filter::Sort;
use certconsole::models::page::FetchOutcome;
use certconsole::pages::list_page::Severity;
use certconsole::views::table::{self, RowAction, TableFooter};
use chrono::NaiveDate;
use common::MockBackend;
use tokio::time::Instant;

fn query_of(backend: &MockBackend, index: usize) -> std::collections::HashMap<String, String> {
    backend.requests_to(Method::GET, "/api/certificats")[index]
        .query
        .clone()
}

#[tokio::test]
async fn test_certificates_open_and_load_more() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("bob", "hunter2").await;
    let mut page = state.certificates_page();

    assert!(page.open().await.is_loaded());
    assert_eq!(page.items().len(), 2);
    assert!(page.has_more());

    let first = query_of(&backend, 0);
    assert_eq!(first.get("page").map(String::as_str), Some("0"));
    assert_eq!(first.get("sort").map(String::as_str), Some("expirationDate,asc"));
    assert!(!first.contains_key("globalSearch"));

    page.load_more().await.unwrap();
    assert_eq!(page.items().len(), 3);
    assert!(!page.has_more());
    assert!(page.load_more().await.is_none());
    assert_eq!(backend.requests_to(Method::GET, "/api/certificats").len(), 2);

    let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let items = page.items();
    let rows = table::render(&items, today);
    assert_eq!(rows[0].cells[0], "1001");
    assert_eq!(table::footer(rows.len(), page.is_loading(), page.has_more()), TableFooter::AllLoaded);
}

#[tokio::test]
async fn test_certificate_filters_are_sent_day_first() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("bob", "hunter2").await;
    let mut page = state.certificates_page();
    page.open().await;

    page.edit_filter("creationDate", "2024-02-01", Instant::now()).unwrap();
    page.edit_filter("commonName", "alpha", Instant::now()).unwrap();
    assert!(page.edit_filter("expirationDate", "soon", Instant::now()).is_err());
    page.apply_panel().await;

    let sent = query_of(&backend, 1);
    assert_eq!(sent.get("creationDate").map(String::as_str), Some("01-02-2024"));
    assert_eq!(sent.get("commonName").map(String::as_str), Some("alpha"));
    assert_eq!(sent.get("page").map(String::as_str), Some("0"));
}

#[tokio::test]
async fn test_search_and_sort_restart_from_first_page() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("bob", "hunter2").await;
    let mut page = state.certificates_page();
    page.open().await;
    page.load_more().await;

    page.search_input("beta", Instant::now());
    page.submit_search().await;
    let sent = query_of(&backend, 2);
    assert_eq!(sent.get("globalSearch").map(String::as_str), Some("beta"));
    assert_eq!(sent.get("page").map(String::as_str), Some("0"));

    page.sort_by("commonName").await.unwrap();
    let sent = query_of(&backend, 3);
    assert_eq!(sent.get("sort").map(String::as_str), Some("commonName,asc"));
    assert_eq!(sent.get("globalSearch").map(String::as_str), Some("beta"));
    assert_eq!(page.sort(), &Sort::asc("commonName"));
}

#[tokio::test]
async fn test_staged_filters_search_and_sort_share_one_fetch() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("bob", "hunter2").await;
    let mut page = state.certificates_page();

    page.edit_filter("commonName", "alpha", Instant::now()).unwrap();
    page.stage_panel();
    page.stage_search("beta");
    page.stage_sort(Sort::desc("commonName"));
    assert!(page.reload().await.is_loaded());

    let gets = backend.requests_to(Method::GET, "/api/certificats");
    assert_eq!(gets.len(), 1);
    assert_eq!(gets[0].query.get("commonName").map(String::as_str), Some("alpha"));
    assert_eq!(gets[0].query.get("globalSearch").map(String::as_str), Some("beta"));
    assert_eq!(gets[0].query.get("sort").map(String::as_str), Some("commonName,desc"));
}

#[tokio::test]
async fn test_debounced_search_fires_once() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("bob", "hunter2").await;
    let mut page = state.certificates_page();
    page.open().await;

    page.search_input("a", Instant::now());
    page.search_input("al", Instant::now());
    page.search_input("alp", Instant::now());
    let deadline = page.next_deadline().unwrap();
    assert!(page.poll_timers(Instant::now()).await.is_none());

    tokio::time::sleep_until(deadline + Duration::from_millis(1)).await;
    assert!(page.poll_timers(Instant::now()).await.is_some());

    let gets = backend.requests_to(Method::GET, "/api/certificats");
    assert_eq!(gets.len(), 2);
    assert_eq!(gets[1].query.get("globalSearch").map(String::as_str), Some("alp"));
}

#[tokio::test]
async fn test_certificate_create_and_delete() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("alice", "secret").await;
    let mut page = state.certificates_page();
    page.open().await;

    let draft = NewCertificate {
        id_demand: "D-77".to_string(),
        demande_name: "renewal".to_string(),
        model: "X509".to_string(),
        cert_type: "SSL".to_string(),
        organizational_unit: None,
        common_name: "new.example.com".to_string(),
        creation_date: None,
        expiration_date: NaiveDate::from_ymd_opt(2030, 3, 9),
    };
    let notice = page.create(&draft).await;
    assert_eq!(notice.severity, Severity::Success);
    assert_eq!(notice.message, "Certificate created successfully!");

    let posted = backend.requests_to(Method::POST, "/api/certificats");
    assert_eq!(posted[0].body["idDemand"], "D-77");
    assert_eq!(posted[0].body["type"], "SSL");
    assert!(posted[0].body.get("organizationalUnit").is_none());

    let first = page.items()[0].clone();
    let notice = page.delete(&first).await;
    assert!(notice.is_success());
    assert_eq!(notice.message, "Certificate deleted successfully!");
    assert_eq!(backend.requests_to(Method::DELETE, "/api/certificats/1").len(), 1);
}

#[tokio::test]
async fn test_backend_field_errors_reach_the_notice() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("alice", "secret").await;
    let mut page = state.certificates_page();
    page.open().await;
    let fetches = backend.requests_to(Method::GET, "/api/certificats").len();

    let draft = NewCertificate {
        id_demand: "D-78".to_string(),
        demande_name: "renewal".to_string(),
        model: "X509".to_string(),
        cert_type: "SSL".to_string(),
        organizational_unit: None,
        common_name: "not valid".to_string(),
        creation_date: None,
        expiration_date: NaiveDate::from_ymd_opt(2030, 3, 9),
    };
    let notice = page.create(&draft).await;

    assert_eq!(notice.severity, Severity::Error);
    assert_eq!(notice.message, "Validation failed");
    let fields = notice.field_errors.unwrap();
    assert_eq!(fields.get("commonName").map(String::as_str), Some("Invalid common name"));
    // No refresh after a failed mutation.
    assert_eq!(backend.requests_to(Method::GET, "/api/certificats").len(), fetches);
}

#[tokio::test]
async fn test_invalid_draft_is_not_sent() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("alice", "secret").await;
    let mut page = state.certificates_page();

    let draft = NewCertificate {
        id_demand: "D-79".to_string(),
        ..Default::default()
    };
    let notice = page.create(&draft).await;

    assert_eq!(notice.severity, Severity::Error);
    assert!(notice.field_errors.unwrap().contains_key("expirationDate"));
    assert!(backend.requests_to(Method::POST, "/api/certificats").is_empty());
}

#[tokio::test]
async fn test_user_deletion_echoes_id_number() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("alice", "secret").await;
    let mut page = state.users_page();
    page.open().await;

    let sent = backend.requests_to(Method::GET, "/api/users");
    assert_eq!(sent[0].query.get("sort").map(String::as_str), Some("createdAt,desc"));

    let bob = page
        .items()
        .into_iter()
        .find(|u| u.username == "bob")
        .unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let rows = table::render(std::slice::from_ref(&bob), today);
    assert!(rows[0].actions.contains(&RowAction::RevokeTokens));

    assert_eq!(page.request_delete(&bob).unwrap().id_number, "N-2");
    let notice = page.confirm_delete().await.unwrap();
    assert!(notice.is_success());
    assert_eq!(notice.message, "User deleted");
    assert!(page.pending_delete().is_none());

    let deletes = backend.requests_to(Method::DELETE, "/api/users/2");
    assert_eq!(deletes[0].body["userIdNumber"], "N-2");
}

#[tokio::test]
async fn test_cancelled_deletion_sends_nothing() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("alice", "secret").await;
    let mut page = state.users_page();
    page.open().await;
    let bob = page.items()[1].clone();

    page.request_delete(&bob);
    page.cancel_delete();

    assert!(page.confirm_delete().await.is_none());
    assert!(backend.requests_to(Method::DELETE, "/api/users/2").is_empty());
}

#[tokio::test]
async fn test_revoke_tokens_keeps_the_list() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("alice", "secret").await;
    let mut page = state.users_page();
    page.open().await;
    let fetches = backend.requests_to(Method::GET, "/api/users").len();
    let bob = page.items()[1].clone();

    let notice = page.revoke_tokens(&bob).await;

    assert!(notice.is_success());
    assert_eq!(notice.message, "Tokens revoked");
    assert_eq!(backend.requests_to(Method::POST, "/api/users/2/revoke-tokens").len(), 1);
    assert_eq!(backend.requests_to(Method::GET, "/api/users").len(), fetches);
}

#[tokio::test]
async fn test_user_row_without_id_is_listed_but_not_actionable() {
    let backend = MockBackend::start().await;
    backend.behaviour().keyless_user.store(true, Ordering::SeqCst);
    let (state, _) = backend.signed_in("alice", "secret").await;
    let mut page = state.users_page();

    assert!(page.open().await.is_loaded());
    let items = page.items();
    assert_eq!(items.len(), 3);
    let rows = table::render(&items, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    assert_eq!(rows[0].key, "1-0");
    assert_eq!(rows[2].key, "user-2");

    let carol = items[2].clone();
    assert!(page.request_delete(&carol).is_none());
    let notice = page.revoke_tokens(&carol).await;
    assert_eq!(notice.severity, Severity::Error);
    assert_eq!(notice.message, "Failed to revoke tokens");
    assert!(backend.requests().iter().all(|r| !r.path.ends_with("revoke-tokens")));
}

#[tokio::test]
async fn test_forbidden_list_shows_backend_message() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("bob", "hunter2").await;
    let mut page = state.users_page();

    let outcome = page.open().await;

    assert_eq!(outcome, FetchOutcome::Failed("Administrators only".to_string()));
    assert!(page.items().is_empty());
    assert!(!page.has_more());
    // A 403 keeps the session.
    assert!(state.session.snapshot().is_authenticated);
}

#[tokio::test]
async fn test_lookup_by_id_number() {
    let backend = MockBackend::start().await;
    let (state, _) = backend.signed_in("alice", "secret").await;
    let users = state.user_service();

    assert_eq!(users.get_by_id_number("N-2").await.unwrap().username, "bob");
    let err = users.get_by_id_number("N-404").await.unwrap_err();
    assert_eq!(err.user_message(), "No user with that id number");
    assert_eq!(users.get_by_id(2).await.unwrap().id_number, "N-2");
}
