//! Page and session endpoints.
//!
//! Page handlers return JSON page data; rendering happens elsewhere.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::session::cookie::{self, CookieChange};
use crate::session::SessionContext;

/// Login form fields. Missing fields are treated as empty.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
struct LoginFailure {
    email: String,
    error: bool,
    message: &'static str,
}

/// `/`, `/login` and `/register`: send signed-in users home.
pub async fn public_page(State(state): State<AppState>, session: SessionContext) -> Response {
    match session.identity {
        Some(user) => {
            tracing::debug!(user = %user, "Signed-in user on public page, redirecting home");
            Redirect::to(&state.session.home_path).into_response()
        }
        None => Json(serde_json::json!({ "authenticated": false })).into_response(),
    }
}

pub async fn dashboard(session: SessionContext) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "userInfo": session.identity }))
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match state.upstream.obtain_pair(&form.email, &form.password).await {
        Ok(pair) => {
            let changes = [
                CookieChange::Set {
                    name: state.session.access_cookie.clone(),
                    value: pair.access,
                    max_age_secs: state.session.access_max_age_secs,
                },
                CookieChange::Set {
                    name: state.session.refresh_cookie.clone(),
                    value: pair.refresh,
                    max_age_secs: state.session.refresh_max_age_secs,
                },
            ];
            let mut response = Redirect::to(&state.session.home_path).into_response();
            cookie::apply_changes(response.headers_mut(), &changes, state.gate.cookie_attributes());
            tracing::info!("Login successful");
            response
        }
        Err(e) => {
            let status = if e.is_rejection() {
                StatusCode::UNAUTHORIZED
            } else {
                tracing::error!(error = %e, "Login could not reach upstream");
                StatusCode::BAD_GATEWAY
            };
            tracing::warn!(status = %status, "Login failed");
            let body = LoginFailure {
                email: form.email,
                error: true,
                message: "Login failed. Please try again.",
            };
            (status, Json(body)).into_response()
        }
    }
}

pub async fn logout(State(state): State<AppState>, session: SessionContext) -> Response {
    if let Some(user) = &session.identity {
        tracing::info!(user = %user, "Logging out");
    }
    let mut response = (StatusCode::FOUND, [(header::LOCATION, state.session.landing_path.clone())])
        .into_response();
    cookie::apply_changes(
        response.headers_mut(),
        &state.gate.clear_credentials(),
        state.gate.cookie_attributes(),
    );
    response
}
