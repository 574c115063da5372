//! Test fixtures: mock backend and deterministic crypto

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use control_api::ApiClient;
use control_auth::constants::ACCESS_TOKEN_KEY;
use control_auth::{
    Crypto, IdentityProvider, MemoryStorage, SessionState, Storage, SystemCrypto,
    compute_challenge,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use url::Url;

use crate::session::{AuthSession, SessionConfig};

/// What the mock profile endpoint answers.
pub(crate) enum ProfileMode {
    User(Vec<&'static str>),
    Unauthorized,
    ServerError,
}

struct BackendState {
    /// When set, the exchange only accepts a verifier hashing to this challenge
    accepted_challenge: Mutex<Option<String>>,
    refresh_token: Mutex<Option<String>>,
    profile: Mutex<ProfileMode>,
    verifiers: Mutex<Vec<String>>,
    profile_authorizations: Mutex<Vec<String>>,
    /// When set, the exchange waits for a notification before answering
    exchange_gate: Mutex<Option<Arc<Notify>>>,
}

/// Mock control-plane backend on an ephemeral port.
///
/// `POST /auth/callback` accepts code `authcode123` and issues `tok1`;
/// `GET /api/v1/control/me` answers according to `ProfileMode`
/// (default: an admin user).
pub(crate) struct TestBackend {
    pub url: String,
    state: Arc<BackendState>,
}

impl TestBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState {
            accepted_challenge: Mutex::new(None),
            refresh_token: Mutex::new(None),
            profile: Mutex::new(ProfileMode::User(vec!["admins"])),
            verifiers: Mutex::new(Vec::new()),
            profile_authorizations: Mutex::new(Vec::new()),
            exchange_gate: Mutex::new(None),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new()
            .route("/auth/callback", axum::routing::post(exchange))
            .route("/api/v1/control/me", axum::routing::get(profile))
            .with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn accept_challenge(&self, challenge: &str) {
        *self.state.accepted_challenge.lock().unwrap() = Some(challenge.to_string());
    }

    pub fn issue_refresh_token(&self, token: &str) {
        *self.state.refresh_token.lock().unwrap() = Some(token.to_string());
    }

    /// Park every exchange request until the returned `Notify` fires.
    pub fn hold_exchange(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.state.exchange_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_profile(&self, mode: ProfileMode) {
        *self.state.profile.lock().unwrap() = mode;
    }

    /// Verifiers received by the exchange endpoint, in order.
    pub fn exchanged_verifiers(&self) -> Vec<String> {
        self.state.verifiers.lock().unwrap().clone()
    }

    /// Authorization header of every profile request, in order.
    pub fn profile_authorizations(&self) -> Vec<String> {
        self.state.profile_authorizations.lock().unwrap().clone()
    }
}

async fn exchange(
    State(state): State<Arc<BackendState>>,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    let verifier = body["code_verifier"].as_str().unwrap_or("").to_string();
    state.verifiers.lock().unwrap().push(verifier.clone());

    let gate = state.exchange_gate.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }

    let challenge_ok = state
        .accepted_challenge
        .lock()
        .unwrap()
        .as_ref()
        .is_none_or(|expected| *expected == compute_challenge(&verifier));
    if body["code"] != "authcode123" || !challenge_ok {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({"ok": false, "error": "invalid_grant"})),
        )
            .into_response();
    }

    let mut data = json!({"access_token": "tok1"});
    if let Some(refresh) = state.refresh_token.lock().unwrap().clone() {
        data["refresh_token"] = Value::String(refresh);
    }
    axum::Json(json!({"ok": true, "data": data})).into_response()
}

async fn profile(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    state.profile_authorizations.lock().unwrap().push(authorization);

    match &*state.profile.lock().unwrap() {
        ProfileMode::User(groups) => axum::Json(json!({
            "ok": true,
            "data": {
                "id": "7b1e",
                "authentik_uid": "ak-42",
                "email": "ada@example.com",
                "display_name": "Ada",
                "groups": groups,
                "is_banned": false,
                "created_at": "2026-01-01T00:00:00Z",
                "updated_at": "2026-02-01T00:00:00Z",
            }
        }))
        .into_response(),
        ProfileMode::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        ProfileMode::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({"ok": false, "error": "profile service unavailable"})),
        )
            .into_response(),
    }
}

/// Predictable randomness: call `n` yields `len` bytes of value `n`.
#[derive(Default)]
pub(crate) struct CountingCrypto {
    next: AtomicU8,
}

impl Crypto for CountingCrypto {
    fn secure_random_bytes(&self, len: usize) -> Vec<u8> {
        vec![self.next.fetch_add(1, Ordering::Relaxed); len]
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        SystemCrypto.sha256(data)
    }
}

pub(crate) fn test_config() -> SessionConfig {
    SessionConfig {
        identity: IdentityProvider {
            issuer: Url::parse("https://auth.example.com/application/o/control/").unwrap(),
            client_id: "control-panel".into(),
            redirect_uri: Url::parse("https://control.example.com/auth/callback").unwrap(),
        },
        login_url: Url::parse("https://control.example.com/login").unwrap(),
    }
}

/// Session against `backend`, optionally restored with a durable access token.
///
/// Returns the session with its durable and short-lived storage.
pub(crate) fn session_with(
    backend: &TestBackend,
    token: Option<&str>,
) -> (AuthSession, Arc<MemoryStorage>, Arc<MemoryStorage>) {
    let durable = Arc::new(MemoryStorage::new());
    if let Some(token) = token {
        durable.set(ACCESS_TOKEN_KEY, token).unwrap();
    }
    let state = Arc::new(SessionState::restore(durable.clone()));
    let api = ApiClient::new(&backend.url, reqwest::Client::new(), state);
    let ephemeral = Arc::new(MemoryStorage::new());
    let session = AuthSession::new(
        test_config(),
        api,
        ephemeral.clone(),
        Arc::new(CountingCrypto::default()),
    )
    .unwrap();
    (session, durable, ephemeral)
}
