//! Integration tests for the Estate Locator client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p estate-integration-tests
//! ```
//!
//! Each test starts a [`MockBackend`] on an ephemeral local port and drives
//! a real [`EstateClient`] against it. The backend mimics the auth surface
//! (login, admin login, registration, token refresh) plus a few protected
//! endpoints, and records every call so tests can count refreshes and
//! inspect the bearer tokens that were sent.
//!
//! # Test Categories
//!
//! - `session_lifecycle` - Bootstrap, login, registration, logout
//! - `request_pipeline` - Bearer injection, refresh-and-retry, expiry
//! - `route_gate` - Route table decisions against live sessions

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use estate_client::{ClientConfig, EstateClient, MemoryNavigator, MemoryStore};
use estate_core::Role;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// Message the mock returns for an already registered username.
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// One request as the backend saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    /// Path below the API root, e.g. `properties/`.
    pub path: &'static str,
    /// Raw `Authorization` header, if any.
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct Account {
    password: String,
    role: Role,
}

#[derive(Default)]
struct MockState {
    accounts: Mutex<HashMap<String, Account>>,
    valid_access: Mutex<HashSet<String>>,
    valid_refresh: Mutex<HashSet<String>>,
    queued_access: Mutex<VecDeque<String>>,
    refresh_delay: Mutex<Duration>,
    requests: Mutex<Vec<Recorded>>,
    issued: AtomicUsize,
}

impl MockState {
    fn record(&self, path: &'static str, headers: &HeaderMap) {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        lock(&self.requests).push(Recorded {
            path,
            authorization,
        });
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| lock(&self.valid_access).contains(token))
    }

    fn next_access(&self) -> String {
        let token = lock(&self.queued_access).pop_front().unwrap_or_else(|| {
            format!("access-{}", self.issued.fetch_add(1, Ordering::SeqCst))
        });
        lock(&self.valid_access).insert(token.clone());
        token
    }

    fn next_refresh(&self) -> String {
        let token = format!("refresh-{}", self.issued.fetch_add(1, Ordering::SeqCst));
        lock(&self.valid_refresh).insert(token.clone());
        token
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the backend API.
///
/// Serves under `/api/`. Tokens are opaque strings the mock tracks in sets;
/// tests make them valid or invalid directly.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/accounts/login/", post(login))
            .route("/api/accounts/admin-login/", post(admin_login))
            .route("/api/accounts/register/", post(register))
            .route("/api/accounts/token/refresh/", post(refresh))
            .route("/api/properties/", get(list_properties).post(create_property))
            .route("/api/always-401/", get(always_unauthorized))
            .route("/api/missing/", get(missing))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// API root to configure the client with.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// Register an account directly.
    pub fn add_user(&self, username: &str, password: &str, role: Role) {
        lock(&self.state.accounts).insert(
            username.to_owned(),
            Account {
                password: password.to_owned(),
                role,
            },
        );
    }

    /// Whether an account exists.
    #[must_use]
    pub fn has_user(&self, username: &str) -> bool {
        lock(&self.state.accounts).contains_key(username)
    }

    /// Accept `token` as a bearer token.
    pub fn grant_access(&self, token: &str) {
        lock(&self.state.valid_access).insert(token.to_owned());
    }

    /// Accept `token` at the refresh endpoint.
    pub fn grant_refresh(&self, token: &str) {
        lock(&self.state.valid_refresh).insert(token.to_owned());
    }

    /// Invalidate every access token issued so far.
    pub fn expire_access_tokens(&self) {
        lock(&self.state.valid_access).clear();
    }

    /// Invalidate every refresh token issued so far.
    pub fn revoke_refresh_tokens(&self) {
        lock(&self.state.valid_refresh).clear();
    }

    /// Make the next refresh issue `token`.
    pub fn queue_access_token(&self, token: &str) {
        lock(&self.state.queued_access).push_back(token.to_owned());
    }

    /// Delay every refresh response by `delay`.
    pub fn set_refresh_delay(&self, delay: Duration) {
        *lock(&self.state.refresh_delay) = delay;
    }

    /// Every request received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.state.requests).clone()
    }

    /// Requests received for `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Number of refresh calls received.
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.requests_to("accounts/token/refresh/").len()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Handlers
// =============================================================================

type Shared = State<Arc<MockState>>;

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn issue_login(state: &MockState, body: &Value, admin_only: bool) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let account = lock(&state.accounts).get(username).cloned();
    let Some(account) = account.filter(|a| a.password == password) else {
        return error(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "No active account found with the given credentials"}),
        );
    };
    if admin_only && account.role != Role::Admin {
        return error(StatusCode::FORBIDDEN, json!({"detail": "Admin access required"}));
    }

    Json(json!({
        "access": state.next_access(),
        "refresh": state.next_refresh(),
        "role": account.role.as_str(),
    }))
    .into_response()
}

async fn login(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("accounts/login/", &headers);
    issue_login(&state, &body, false)
}

async fn admin_login(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("accounts/admin-login/", &headers);
    issue_login(&state, &body, true)
}

async fn register(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("accounts/register/", &headers);

    let username = body["username"].as_str().unwrap_or_default().to_owned();
    let password = body["password"].as_str().unwrap_or_default().to_owned();

    let mut accounts = lock(&state.accounts);
    if accounts.contains_key(&username) {
        return error(StatusCode::BAD_REQUEST, json!({"username": [USERNAME_TAKEN]}));
    }
    if password.len() < 8 {
        return error(
            StatusCode::BAD_REQUEST,
            json!({"password": ["This password is too short. It must contain at least 8 characters."]}),
        );
    }
    accounts.insert(
        username.clone(),
        Account {
            password,
            role: Role::Buyer,
        },
    );
    (StatusCode::CREATED, Json(json!({"username": username}))).into_response()
}

async fn refresh(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("accounts/token/refresh/", &headers);

    let delay = *lock(&state.refresh_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let token = body["refresh"].as_str().unwrap_or_default();
    if !lock(&state.valid_refresh).contains(token) {
        return error(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Token is invalid or expired", "code": "token_not_valid"}),
        );
    }
    Json(json!({"access": state.next_access()})).into_response()
}

async fn list_properties(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("properties/", &headers);
    if !state.authorized(&headers) {
        return error(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Given token not valid for any token type"}),
        );
    }
    Json(json!([{"id": 1, "title": "Sea view flat", "city": "Goa"}])).into_response()
}

async fn create_property(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("properties/", &headers);
    if !state.authorized(&headers) {
        return error(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Given token not valid for any token type"}),
        );
    }
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn always_unauthorized(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("always-401/", &headers);
    error(StatusCode::UNAUTHORIZED, json!({"detail": "Nope"}))
}

async fn missing(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("missing/", &headers);
    error(StatusCode::NOT_FOUND, json!({"detail": "Not found."}))
}

// =============================================================================
// Test Context
// =============================================================================

/// A client wired to a mock backend over in-memory storage.
pub struct TestContext {
    pub backend: MockBackend,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<MemoryNavigator>,
    pub client: EstateClient,
}

impl TestContext {
    /// Start a backend and a client whose store holds `entries` and whose
    /// navigator starts at `location`.
    ///
    /// # Panics
    ///
    /// Panics if the backend or the client cannot be started.
    #[allow(clippy::expect_used)]
    pub async fn new(entries: &[(&str, &str)], location: &str) -> Self {
        let backend = MockBackend::start().await.expect("Failed to start mock backend");
        let store = Arc::new(MemoryStore::with_entries(entries.iter().copied()));
        let navigator = Arc::new(MemoryNavigator::new(location));

        let config = ClientConfig::new(&backend.base_url()).expect("Invalid mock backend URL");
        let client = EstateClient::new(config, store.clone(), navigator.clone())
            .await
            .expect("Failed to build client");

        Self {
            backend,
            store,
            navigator,
            client,
        }
    }

    /// Start with an empty store at `/`.
    pub async fn anonymous() -> Self {
        Self::new(&[], "/").await
    }

    /// Value stored under `key`.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn stored(&self, key: &str) -> Option<String> {
        use estate_client::KeyValueStore;
        self.store.get(key).expect("Memory store read failed")
    }
}
