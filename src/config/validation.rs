//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, max-ages > 0)
//! - Check the upstream URL and socket addresses parse
//! - Reject route tables that would redirect in a loop
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("access and refresh cookies share the name '{0}'")]
    DuplicateCookie(String),

    #[error("{field}: path '{value}' must start with '/'")]
    RelativePath { field: &'static str, value: String },

    #[error("landing path '{0}' is not public; unauthenticated requests would redirect forever")]
    LandingNotPublic(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    match url::Url::parse(&config.upstream.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            field: "upstream.base_url",
            value: config.upstream.base_url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field: "upstream.base_url",
            value: config.upstream.base_url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.timeout_secs"));
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.connect_timeout_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    let session = &config.session;
    if session.access_cookie.is_empty() {
        errors.push(ValidationError::Empty("session.access_cookie"));
    }
    if session.refresh_cookie.is_empty() {
        errors.push(ValidationError::Empty("session.refresh_cookie"));
    }
    if !session.access_cookie.is_empty() && session.access_cookie == session.refresh_cookie {
        errors.push(ValidationError::DuplicateCookie(session.access_cookie.clone()));
    }
    if session.subject_claim.is_empty() {
        errors.push(ValidationError::Empty("session.subject_claim"));
    }
    if session.access_max_age_secs == 0 {
        errors.push(ValidationError::Zero("session.access_max_age_secs"));
    }
    if session.refresh_max_age_secs == 0 {
        errors.push(ValidationError::Zero("session.refresh_max_age_secs"));
    }

    for path in &session.public_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativePath {
                field: "session.public_paths",
                value: path.clone(),
            });
        }
    }
    for (field, path) in [
        ("session.landing_path", &session.landing_path),
        ("session.home_path", &session.home_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativePath {
                field,
                value: path.clone(),
            });
        }
    }
    if !session.public_paths.contains(&session.landing_path) {
        errors.push(ValidationError::LandingNotPublic(session.landing_path.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
