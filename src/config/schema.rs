//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream API connection settings.
    pub upstream: UpstreamConfig,

    /// Session cookie and route protection settings.
    pub session: SessionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Security hardening settings.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API; token endpoints live under it.
    pub base_url: String,

    /// Total timeout for a single upstream call in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            timeout_secs: 5,
            connect_timeout_secs: 2,
        }
    }
}

/// Session gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie holding the access credential.
    pub access_cookie: String,

    /// Cookie holding the refresh credential.
    pub refresh_cookie: String,

    /// Lifetime of the access cookie in seconds.
    pub access_max_age_secs: u64,

    /// Lifetime of the refresh cookie in seconds (set at login only).
    pub refresh_max_age_secs: u64,

    /// Mark credential cookies `Secure`.
    pub secure: bool,

    /// Token claim carrying the subject identifier.
    pub subject_claim: String,

    /// Paths reachable without a request identity (exact match).
    pub public_paths: Vec<String>,

    /// Redirect target for unauthenticated access to protected paths.
    pub landing_path: String,

    /// Redirect target for authenticated users on public pages and after login.
    pub home_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_cookie: "accessToken".to_string(),
            refresh_cookie: "refreshToken".to_string(),
            access_max_age_secs: 60 * 60,
            refresh_max_age_secs: 60 * 60 * 24 * 7,
            secure: true,
            subject_claim: "user_id".to_string(),
            public_paths: vec!["/".to_string(), "/login".to_string(), "/register".to_string()],
            landing_path: "/".to_string(),
            home_path: "/dashboard".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub enable_headers: bool,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 10 * 1024 * 1024, // 10MB, room for PDF uploads through the relay
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
