//! HTTP client for the upstream API.
//!
//! # Responsibilities
//! - Token endpoints: obtain pair, verify, refresh
//! - Relay authenticated requests for the `/api` surface
//! - Bound every call with connect and total timeouts
//! - Record per-endpoint call metrics

use axum::body::Bytes;
use axum::http::{HeaderValue, Method};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use url::Url;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::session::credential::{AccessCredential, RefreshCredential};
use crate::session::gate::CredentialService;
use crate::upstream::error::UpstreamError;

const OBTAIN_PATH: &str = "token/";
const VERIFY_PATH: &str = "token/verify/";
const REFRESH_PATH: &str = "token/refresh/";

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Serialize)]
struct ObtainRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Credentials issued at login.
#[derive(Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenPair(..)")
    }
}

/// A request to forward to the upstream on behalf of the caller.
#[derive(Debug)]
pub struct RelayRequest {
    pub method: Method,
    /// Path relative to the upstream base URL, still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<HeaderValue>,
    pub bearer: Option<AccessCredential>,
    pub body: Bytes,
}

/// Upstream API client. Cheap to clone.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base: Url,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut base = Url::parse(&config.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        tracing::info!(base_url = %base, "Upstream client initialized");
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve `path` against the base URL.
    ///
    /// Dot segments are refused in every spelling the URL parser accepts
    /// (`..`, `.%2e`, `%2e.`, `%2e%2e`, any case), and the joined URL must
    /// still sit under the base path.
    pub fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        let path = path.trim_start_matches('/');
        if path.split(['/', '\\']).any(is_parent_segment) {
            return Err(UpstreamError::InvalidPath(path.to_string()));
        }
        let url = self.base.join(path)?;
        if url.origin() != self.base.origin() || !url.path().starts_with(self.base.path()) {
            return Err(UpstreamError::InvalidPath(path.to_string()));
        }
        Ok(url)
    }

    /// Exchange login credentials for an access/refresh pair.
    pub async fn obtain_pair(&self, username: &str, password: &str) -> Result<TokenPair, UpstreamError> {
        let response = self
            .post_json("obtain", OBTAIN_PATH, &ObtainRequest { username, password })
            .await?;
        let pair: TokenPair = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        if pair.access.is_empty() || pair.refresh.is_empty() {
            return Err(UpstreamError::Decode("empty token in login response".into()));
        }
        Ok(pair)
    }

    /// Forward a request and hand back the raw upstream response.
    pub async fn relay(&self, request: RelayRequest) -> Result<reqwest::Response, UpstreamError> {
        let mut url = self.endpoint(&request.path)?;
        url.set_query(request.query.as_deref());

        let mut builder = self.http.request(request.method, url).body(request.body);
        if let Some(content_type) = request.content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.as_str());
        }

        let started = Instant::now();
        let result = builder.send().await;
        metrics::record_upstream_call("relay", outcome(&result), started);
        Ok(result?)
    }

    async fn post_json<T: Serialize>(
        &self,
        endpoint: &'static str,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, UpstreamError> {
        let url = self.endpoint(path)?;
        let started = Instant::now();
        let result = self.http.post(url).json(body).send().await;
        metrics::record_upstream_call(endpoint, outcome(&result), started);

        let response = result?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(endpoint, status = %status, "Upstream rejected request");
            return Err(UpstreamError::Status(status));
        }
        Ok(response)
    }
}

fn is_parent_segment(segment: &str) -> bool {
    segment.to_ascii_lowercase().replace("%2e", ".") == ".."
}

fn outcome(result: &Result<reqwest::Response, reqwest::Error>) -> &'static str {
    match result {
        Ok(r) if r.status().is_success() => "success",
        Ok(_) => "rejected",
        Err(_) => "error",
    }
}

impl CredentialService for UpstreamClient {
    async fn verify(&self, token: &AccessCredential) -> Result<(), UpstreamError> {
        self.post_json("verify", VERIFY_PATH, &VerifyRequest { token: token.as_str() })
            .await
            .map(|_| ())
    }

    async fn refresh(&self, token: &RefreshCredential) -> Result<AccessCredential, UpstreamError> {
        let response = self
            .post_json("refresh", REFRESH_PATH, &RefreshRequest { refresh: token.as_str() })
            .await?;
        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        if body.access.is_empty() {
            return Err(UpstreamError::Decode("empty access token in refresh response".into()));
        }
        Ok(AccessCredential::new(body.access))
    }
}
