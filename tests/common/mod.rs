//! Shared utilities for integration testing.
#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use bff_gateway::GatewayConfig;

/// Build an unsigned JWT-shaped token carrying `user_id`.
pub fn token_for(user_id: u64) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD
        .encode(json!({ "user_id": user_id, "token_type": "access" }).to_string());
    format!("{header}.{payload}.sig{user_id}")
}

/// What the mock upstream accepts.
#[derive(Default)]
pub struct UpstreamScript {
    pub valid_access: Vec<String>,
    /// refresh token → access token it mints
    pub refresh: Vec<(String, String)>,
    /// (username, password, access, refresh)
    pub logins: Vec<(String, String, String, String)>,
}

#[derive(Default)]
pub struct Recorded {
    pub verify_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub relay_auth: Mutex<Vec<Option<String>>>,
}

#[derive(Clone)]
struct MockState {
    script: Arc<UpstreamScript>,
    recorded: Arc<Recorded>,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub recorded: Arc<Recorded>,
}

impl MockUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Gateway config pointed at this upstream, with non-secure cookies.
    pub fn gateway_config(&self) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.upstream.base_url = self.base_url();
        config.session.secure = false;
        config
    }

    pub fn verify_calls(&self) -> usize {
        self.recorded.verify_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.recorded.refresh_calls.load(Ordering::SeqCst)
    }
}

async fn verify(State(state): State<MockState>, Json(body): Json<Value>) -> impl IntoResponse {
    state.recorded.verify_calls.fetch_add(1, Ordering::SeqCst);
    let token = body["token"].as_str().unwrap_or_default();
    if state.script.valid_access.iter().any(|t| t == token) {
        (StatusCode::OK, Json(json!({})))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" })),
        )
    }
}

async fn refresh(State(state): State<MockState>, Json(body): Json<Value>) -> impl IntoResponse {
    state.recorded.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let token = body["refresh"].as_str().unwrap_or_default();
    match state.script.refresh.iter().find(|(r, _)| r == token) {
        Some((_, access)) => (StatusCode::OK, Json(json!({ "access": access }))),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" })),
        ),
    }
}

async fn obtain(State(state): State<MockState>, Json(body): Json<Value>) -> impl IntoResponse {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match state
        .script
        .logins
        .iter()
        .find(|(u, p, _, _)| u == username && p == password)
    {
        Some((_, _, access, refresh)) => (
            StatusCode::OK,
            Json(json!({ "access": access, "refresh": refresh })),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "No active account found with the given credentials" })),
        ),
    }
}

/// Echo what arrived so tests can check what the relay forwarded.
async fn echo(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.recorded.relay_auth.lock().unwrap().push(auth.clone());

    if uri.path().ends_with("/missing/") {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." })));
    }

    (
        StatusCode::OK,
        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "authorization": auth,
            "content_type": headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            "body": body,
        })),
    )
}

/// Start a scripted upstream on an ephemeral port.
pub async fn start_mock_upstream(script: UpstreamScript) -> MockUpstream {
    let recorded = Arc::new(Recorded::default());
    let state = MockState {
        script: Arc::new(script),
        recorded: recorded.clone(),
    };

    let app = Router::new()
        .route("/api/token/", post(obtain))
        .route("/api/token/verify/", post(verify))
        .route("/api/token/refresh/", post(refresh))
        .fallback(echo)
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, recorded }
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
