//! Credential cookie reading and writing.
//!
//! The cookie store for one exchange is the request's `Cookie` header(s) on
//! the way in and `Set-Cookie` headers on the way out. Only the attributes
//! the gateway needs are modelled.

use axum::http::{header, HeaderMap, HeaderValue};

/// Expiry used to delete a cookie in browsers that ignore `Max-Age=0`.
const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Cookies sent by the client, parsed once per request.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    pairs: Vec<(String, String)>,
}

impl CookieJar {
    /// Parse every `Cookie` header in `headers`.
    ///
    /// Headers are split on raw bytes; a pair that is not UTF-8 is skipped
    /// without losing the rest of its header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut pairs = Vec::new();
        for value in headers.get_all(header::COOKIE) {
            for raw in value.as_bytes().split(|b| *b == b';') {
                let Ok(pair) = std::str::from_utf8(raw) else {
                    continue;
                };
                if let Some((name, value)) = pair.trim().split_once('=') {
                    let value = value.trim();
                    let value = value
                        .strip_prefix('"')
                        .and_then(|v| v.strip_suffix('"'))
                        .unwrap_or(value);
                    pairs.push((name.trim().to_string(), value.to_string()));
                }
            }
        }
        Self { pairs }
    }

    /// First non-empty value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, v)| n == name && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }
}

/// Attributes shared by all credential cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub path: String,
    pub secure: bool,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            secure: true,
        }
    }
}

/// A pending cookie mutation, applied to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    Set {
        name: String,
        value: String,
        max_age_secs: u64,
    },
    Delete {
        name: String,
    },
}

impl CookieChange {
    /// Render as a `Set-Cookie` header value.
    ///
    /// Every credential cookie is `HttpOnly` and `SameSite=Strict`.
    pub fn to_header_value(&self, attrs: &CookieAttributes) -> String {
        let mut out = match self {
            CookieChange::Set {
                name,
                value,
                max_age_secs,
            } => format!("{name}={value}; Path={}; Max-Age={max_age_secs}", attrs.path),
            CookieChange::Delete { name } => {
                format!("{name}=; Path={}; Max-Age=0; Expires={EPOCH}", attrs.path)
            }
        };
        out.push_str("; HttpOnly; SameSite=Strict");
        if attrs.secure {
            out.push_str("; Secure");
        }
        out
    }

    pub fn name(&self) -> &str {
        match self {
            CookieChange::Set { name, .. } | CookieChange::Delete { name } => name,
        }
    }
}

/// Append `Set-Cookie` headers for each change.
///
/// Cookies the response already sets are left alone, so a handler that
/// logs in or out overrides the gate. A change whose rendered value is not
/// a legal header value is skipped and logged.
pub fn apply_changes(headers: &mut HeaderMap, changes: &[CookieChange], attrs: &CookieAttributes) {
    let already_set: Vec<String> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split_once('=').map(|(name, _)| name.trim().to_string()))
        .collect();

    for change in changes {
        if already_set.iter().any(|n| n == change.name()) {
            continue;
        }
        match HeaderValue::from_str(&change.to_header_value(attrs)) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => {
                tracing::error!(cookie = %change.name(), "Refusing to write cookie with invalid characters");
            }
        }
    }
}
