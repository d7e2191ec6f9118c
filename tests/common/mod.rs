#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use serde_json::{Value, json};

use certconsole::repositories::token::MemoryTokenStore;
use certconsole::{AppState, Config};

pub const ALICE_TOKEN: &str = "tok-alice";
pub const BOB_TOKEN: &str = "tok-bob";

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
pub struct Behaviour {
    /// Every token is rejected once set.
    pub revoke_all: AtomicBool,
    /// `/api/auth/logout` answers 500.
    pub logout_fails: AtomicBool,
    /// `/api/users/me` answers 500 even for valid tokens.
    pub profile_fails: AtomicBool,
    /// `/api/users` adds a row without an `id`.
    pub keyless_user: AtomicBool,
}

struct Shared {
    recorded: Mutex<Vec<Recorded>>,
    behaviour: Behaviour,
}

/// A backend stand-in on an ephemeral port.
pub struct MockBackend {
    pub url: String,
    shared: Arc<Shared>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let shared = Arc::new(Shared {
            recorded: Mutex::new(Vec::new()),
            behaviour: Behaviour::default(),
        });
        let app = Router::new().fallback(handle).with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            shared,
        }
    }

    pub fn behaviour(&self) -> &Behaviour {
        &self.shared.behaviour
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.recorded.lock().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn config(&self) -> Config {
        Config::with_api_url(&self.url, std::env::temp_dir().join("certconsole-unused-token"))
    }

    /// Console state with an in-memory token store.
    pub fn state(&self) -> (AppState, Arc<MemoryTokenStore>) {
        self.state_with(MemoryTokenStore::new())
    }

    pub fn state_with(&self, store: MemoryTokenStore) -> (AppState, Arc<MemoryTokenStore>) {
        let store = Arc::new(store);
        let state = AppState::with_repository(&self.config(), store.clone()).unwrap();
        (state, store)
    }

    /// Console state already signed in as `username`.
    pub async fn signed_in(&self, username: &str, password: &str) -> (AppState, Arc<MemoryTokenStore>) {
        let (state, store) = self.state();
        state.auth.login(username, password).await.unwrap();
        (state, store)
    }
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, axum::Json(body)).into_response()
}

fn unauthorized() -> Response {
    json_response(StatusCode::UNAUTHORIZED, json!({"message": "Invalid or expired token"}))
}

fn alice() -> Value {
    json!({
        "id": 1,
        "username": "alice",
        "email": "alice@example.com",
        "firstname": "Alice",
        "lastname": "Martin",
        "idNumber": "N-1",
        "role": "ADMIN",
        "status": "ACTIVE",
        "createdAt": "2024-01-10T08:00:00"
    })
}

fn bob() -> Value {
    json!({
        "id": 2,
        "username": "bob",
        "email": "bob@example.com",
        "firstname": "Bob",
        "lastname": "Durand",
        "idNumber": "N-2",
        "role": "USER",
        "status": "ACTIVE",
        "createdAt": "2024-02-10T08:00:00"
    })
}

fn certificate(id: i64, common_name: &str, expiration: &str) -> Value {
    json!({
        "id": id,
        "idDemand": 1000 + id,
        "demandeName": format!("demand-{}", id),
        "model": "X509",
        "type": "SSL",
        "organizationalUnit": "IT",
        "commonName": common_name,
        "creationDate": "2024-01-01",
        "expirationDate": expiration
    })
}

fn spring_page(content: Vec<Value>, number: u32, total_pages: u32) -> Value {
    json!({
        "content": content,
        "number": number,
        "totalPages": total_pages,
        "last": number + 1 >= total_pages,
        "size": 2
    })
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    let path = uri.path().to_string();
    shared.recorded.lock().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        authorization: authorization.clone(),
        body: body.clone(),
    });

    let behaviour = &shared.behaviour;
    if method == Method::POST && path == "/api/auth/login" {
        return match (body["username"].as_str(), body["password"].as_str()) {
            (Some("alice"), Some("secret")) => json_response(StatusCode::OK, json!({"token": ALICE_TOKEN})),
            (Some("bob"), Some("hunter2")) => json_response(StatusCode::OK, json!({"token": BOB_TOKEN})),
            (Some("ghost"), _) => json_response(StatusCode::OK, json!({"message": "Account suspended"})),
            _ => json_response(StatusCode::UNAUTHORIZED, json!({"message": "Bad credentials"})),
        };
    }

    let me = match authorization.as_deref() {
        _ if behaviour.revoke_all.load(Ordering::SeqCst) => return unauthorized(),
        Some(ALICE_TOKEN) => alice(),
        Some(BOB_TOKEN) => bob(),
        _ => return unauthorized(),
    };
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match (method.as_str(), segments.as_slice()) {
        ("POST", ["api", "auth", "logout"]) => {
            if behaviour.logout_fails.load(Ordering::SeqCst) {
                json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"}))
            } else {
                StatusCode::NO_CONTENT.into_response()
            }
        }
        ("GET", ["api", "users", "me"]) => {
            if behaviour.profile_fails.load(Ordering::SeqCst) {
                json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({"message": "Profile store down"}))
            } else {
                json_response(StatusCode::OK, me)
            }
        }
        ("GET", ["api", "certificats"]) => {
            let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
            let content = match page {
                0 => vec![
                    certificate(1, "alpha.example.com", "2020-05-01"),
                    certificate(2, "beta.example.com", "2099-05-01"),
                ],
                1 => vec![certificate(3, "gamma.example.com", "2099-06-01")],
                _ => Vec::new(),
            };
            json_response(StatusCode::OK, spring_page(content, page, 2))
        }
        ("GET", ["api", "certificats", id]) => match id.parse::<i64>() {
            Ok(id) => json_response(StatusCode::OK, certificate(id, "alpha.example.com", "2099-01-01")),
            Err(_) => json_response(StatusCode::NOT_FOUND, json!({"message": "Not found"})),
        },
        ("POST", ["api", "certificats"]) => {
            if body["commonName"].as_str().is_some_and(|cn| cn.contains(' ')) {
                json_response(
                    StatusCode::BAD_REQUEST,
                    json!({"message": "Validation failed", "errors": {"commonName": "Invalid common name"}}),
                )
            } else {
                json_response(StatusCode::CREATED, json!({"message": "Certificate created successfully!"}))
            }
        }
        ("PUT", ["api", "certificats", _]) => json_response(StatusCode::OK, json!({})),
        ("DELETE", ["api", "certificats", _]) => StatusCode::NO_CONTENT.into_response(),
        ("GET", ["api", "users"]) => {
            if me["role"] == "USER" {
                return json_response(StatusCode::FORBIDDEN, json!({"message": "Administrators only"}));
            }
            let mut users = vec![alice(), bob()];
            if behaviour.keyless_user.load(Ordering::SeqCst) {
                users.push(json!({"username": "carol", "role": "USER", "status": "ACTIVE"}));
            }
            json_response(StatusCode::OK, spring_page(users, 0, 1))
        }
        ("GET", ["api", "users", "by-id-number", "N-2"]) => json_response(StatusCode::OK, bob()),
        ("GET", ["api", "users", "by-id-number", _]) => {
            json_response(StatusCode::NOT_FOUND, json!({"message": "No user with that id number"}))
        }
        ("GET", ["api", "users", "2"]) => json_response(StatusCode::OK, bob()),
        ("GET", ["api", "users", "1"]) => json_response(StatusCode::OK, alice()),
        ("DELETE", ["api", "users", id]) => {
            let expected = if *id == "2" { "N-2" } else { "N-1" };
            if body["userIdNumber"] == expected {
                json_response(StatusCode::OK, json!({"message": "User deleted"}))
            } else {
                json_response(StatusCode::BAD_REQUEST, json!({"message": "ID number does not match"}))
            }
        }
        ("POST", ["api", "users", _, "revoke-tokens"]) => json_response(StatusCode::OK, json!("Tokens revoked")),
        _ => json_response(StatusCode::NOT_FOUND, json!({"message": "No such endpoint"})),
    }
}
