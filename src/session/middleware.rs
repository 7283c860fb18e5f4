//! Session gate middleware.
//! Runs before every route handler.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;

use crate::observability::metrics;
use crate::session::cookie::{self, CookieJar};
use crate::session::credential::{AccessCredential, RequestIdentity};
use crate::session::gate::{CredentialService, GateDecision, SessionGate};

/// Context attached to every request that passes the gate.
///
/// Handlers take this as an argument instead of reading ambient state.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    pub identity: Option<RequestIdentity>,
    /// Credential in force for this request, refreshed if the gate refreshed it.
    pub access_token: Option<AccessCredential>,
}

impl<S: Send + Sync> FromRequestParts<S> for SessionContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .unwrap_or_default())
    }
}

pub async fn session_gate_middleware<S>(
    State(gate): State<Arc<SessionGate<S>>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    S: CredentialService + 'static,
{
    let jar = CookieJar::from_headers(req.headers());
    let path = req.uri().path().to_string();

    // Cookie changes are only written once a response exists; an aborted
    // request drops this future and leaves the client's cookies untouched.
    let resolution = gate.resolve(&jar).await;
    metrics::record_gate_outcome(resolution.state.as_str());

    match &resolution.identity {
        Some(user) => tracing::debug!(user = %user, path = %path, "Request authenticated"),
        None => tracing::debug!(path = %path, "Anonymous request"),
    }

    let mut response = match gate.authorize(&path, resolution.identity) {
        GateDecision::Reject { location } => {
            metrics::record_redirect();
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        GateDecision::Allow(identity) => {
            req.extensions_mut().insert(SessionContext {
                identity,
                access_token: resolution.access_token,
            });
            next.run(req).await
        }
    };

    cookie::apply_changes(response.headers_mut(), &resolution.cookies, gate.cookie_attributes());
    response
}
