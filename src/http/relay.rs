//! Generic pass-through for `/api/*`.
//!
//! The path after `/api/` is resolved against the upstream base URL and the
//! request is sent with the caller's access credential as a bearer token.
//! Status, content type and body come back unchanged.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::session::SessionContext;
use crate::upstream::{RelayRequest, UpstreamError};

pub const RELAY_PREFIX: &str = "/api/";

pub async fn relay_handler(
    State(state): State<AppState>,
    session: SessionContext,
    request: Request<Body>,
) -> Response {
    let request_id = request_id(&request).to_string();
    let (parts, body) = request.into_parts();
    let path = parts
        .uri
        .path()
        .strip_prefix(RELAY_PREFIX)
        .unwrap_or_default()
        .to_string();

    // The body limit layer makes this fail once the configured size is exceeded.
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response(),
    };

    tracing::debug!(request_id = %request_id, method = %parts.method, path = %path, "Relaying request");

    let relay = RelayRequest {
        method: parts.method,
        path,
        query: parts.uri.query().map(str::to_string),
        content_type: parts.headers.get(header::CONTENT_TYPE).cloned(),
        bearer: session.access_token,
        body,
    };

    let upstream = match state.upstream.relay(relay).await {
        Ok(response) => response,
        Err(UpstreamError::InvalidPath(path)) => {
            tracing::warn!(request_id = %request_id, path = %path, "Refusing relay path");
            return (StatusCode::BAD_REQUEST, "Invalid path").into_response();
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to read upstream body");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let mut response = (status, bytes).into_response();
    match content_type {
        Some(ct) => {
            response.headers_mut().insert(header::CONTENT_TYPE, ct);
        }
        None => {
            response.headers_mut().remove(header::CONTENT_TYPE);
        }
    }
    response
}
