//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, headers)
//! - Install the session gate in front of every route
//! - Bind server to listener and shut down gracefully

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware,
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, SessionConfig};
use crate::http::handlers::{dashboard, login, logout, public_page};
use crate::http::relay::relay_handler;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::ShutdownSignal;
use crate::session::{session_gate_middleware, SessionGate};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<SessionGate<UpstreamClient>>,
    pub upstream: UpstreamClient,
    pub session: Arc<SessionConfig>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    upstream_base: String,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let gate = Arc::new(SessionGate::new(
            upstream.clone(),
            &config.session,
            Duration::from_secs(config.upstream.timeout_secs),
        ));

        let state = AppState {
            gate,
            upstream,
            session: Arc::new(config.session.clone()),
        };

        let upstream_base = state.upstream.base_url().to_string();
        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            upstream_base,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let gate = state.gate.clone();

        let router = Router::new()
            .route("/", get(public_page))
            .route("/login", get(public_page).post(login))
            .route("/register", get(public_page))
            .route("/logout", get(logout))
            .route("/dashboard", get(dashboard))
            .route("/api/{*path}", any(relay_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                gate,
                session_gate_middleware::<UpstreamClient>,
            ))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(req),
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }))
            .layer(set_request_id_layer());

        if config.security.enable_headers {
            router
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
        } else {
            router
        }
    }

    /// The fully layered router, for serving or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.upstream_base,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let reason = shutdown.wait().await;
                tracing::info!(reason = reason.as_str(), "Shutting down, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
