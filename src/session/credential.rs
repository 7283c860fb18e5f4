//! Credential and identity types.

use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors from reading claims out of an access credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("token is not a three-part JWT")]
    Malformed,

    #[error("token payload is not valid base64url")]
    Encoding,

    #[error("token payload is not a JSON object")]
    Payload,

    #[error("claim '{0}' missing or not a string/number")]
    MissingClaim(String),
}

/// Short-lived bearer token issued by the upstream.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredential(String);

/// Long-lived token used only to mint a new [`AccessCredential`].
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshCredential(String);

// Tokens never end up in logs.
impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessCredential(..)")
    }
}

impl fmt::Debug for RefreshCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshCredential(..)")
    }
}

impl AccessCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the subject claim without checking signature or expiry.
    ///
    /// Only call this after the upstream has confirmed the token is valid.
    pub fn subject(&self, claim: &str) -> Result<RequestIdentity, CredentialError> {
        let mut parts = self.0.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialError::Malformed);
        };

        let bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| CredentialError::Encoding)?;
        let claims: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|_| CredentialError::Payload)?;

        match claims.get(claim) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(RequestIdentity::new(s.clone())),
            Some(serde_json::Value::Number(n)) => Ok(RequestIdentity::new(n.to_string())),
            _ => Err(CredentialError::MissingClaim(claim.to_string())),
        }
    }
}

impl RefreshCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The authenticated caller of the current request.
///
/// The upstream decides whether a caller is authenticated; the subject is
/// only a label read from the credential afterwards. A credential the
/// upstream accepted but whose claims cannot be read yields an unnamed
/// identity, which still counts as signed in and serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestIdentity(Option<String>);

impl RequestIdentity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self(Some(subject.into()))
    }

    pub fn unnamed() -> Self {
        Self(None)
    }

    pub fn subject(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subject().unwrap_or("<unnamed>"))
    }
}

/// Build an unsigned JWT-shaped token carrying `claims`, for tests.
#[cfg(test)]
pub(crate) fn test_token(claims: serde_json::Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_subject() {
        let token = AccessCredential::new(test_token(json!({"user_id": 42, "exp": 1})));
        assert_eq!(token.subject("user_id"), Ok(RequestIdentity::new("42")));
    }

    #[test]
    fn test_string_subject_with_custom_claim() {
        let token = AccessCredential::new(test_token(json!({"sub": "alice"})));
        assert_eq!(token.subject("sub").unwrap().subject(), Some("alice"));
        assert_eq!(
            token.subject("user_id"),
            Err(CredentialError::MissingClaim("user_id".into()))
        );
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(
            AccessCredential::new("opaque").subject("user_id"),
            Err(CredentialError::Malformed)
        );
        assert_eq!(
            AccessCredential::new("a.!!!.c").subject("user_id"),
            Err(CredentialError::Encoding)
        );
        let not_json = general_purpose::URL_SAFE_NO_PAD.encode("[1,2]");
        assert_eq!(
            AccessCredential::new(format!("h.{not_json}.s")).subject("user_id"),
            Err(CredentialError::Payload)
        );
    }

    #[test]
    fn test_unnamed_identity() {
        let identity = RequestIdentity::unnamed();
        assert_eq!(identity.subject(), None);
        assert_eq!(identity.to_string(), "<unnamed>");
        assert_eq!(serde_json::to_value(&identity).unwrap(), serde_json::Value::Null);
        assert_eq!(serde_json::to_value(RequestIdentity::new("42")).unwrap(), json!("42"));
    }

    #[test]
    fn test_debug_hides_token() {
        let token = AccessCredential::new("secret.value.here");
        assert_eq!(format!("{token:?}"), "AccessCredential(..)");
    }
}
