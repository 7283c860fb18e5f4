//! Per-request credential resolution and route protection.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::session::cookie::{CookieAttributes, CookieChange, CookieJar};
use crate::session::credential::{AccessCredential, RefreshCredential, RequestIdentity};
use crate::session::routes::RouteTable;
use crate::upstream::UpstreamError;

/// The upstream endpoints the gate depends on.
pub trait CredentialService: Send + Sync {
    /// Succeeds when the upstream accepts `token` as valid and unexpired.
    fn verify(
        &self,
        token: &AccessCredential,
    ) -> impl Future<Output = Result<(), UpstreamError>> + Send;

    /// Exchange a refresh credential for a new access credential.
    fn refresh(
        &self,
        token: &RefreshCredential,
    ) -> impl Future<Output = Result<AccessCredential, UpstreamError>> + Send;
}

/// Why a request ended up without an identity (or was turned away).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("no access credential presented")]
    MissingCredential,

    #[error("access credential rejected: {0}")]
    VerificationFailed(String),

    #[error("refresh credential rejected: {0}")]
    RefreshFailed(String),

    #[error("unauthenticated access to protected path '{0}'")]
    UnauthorizedRouteAccess(String),
}

/// Per-request resolution states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NoCredential,
    Verifying,
    Verified,
    RefreshPending,
    Refreshed,
    Rejected,
}

impl GateState {
    pub fn is_terminal(self) -> bool {
        matches!(self, GateState::Verified | GateState::Refreshed | GateState::Rejected)
    }

    /// Transitions allowed by the per-request state machine.
    pub fn can_advance_to(self, next: GateState) -> bool {
        matches!(
            (self, next),
            (GateState::NoCredential, GateState::Rejected)
                | (GateState::Verifying, GateState::Verified)
                | (GateState::Verifying, GateState::RefreshPending)
                | (GateState::Verifying, GateState::Rejected)
                | (GateState::RefreshPending, GateState::Refreshed)
                | (GateState::RefreshPending, GateState::Rejected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateState::NoCredential => "no_credential",
            GateState::Verifying => "verifying",
            GateState::Verified => "verified",
            GateState::RefreshPending => "refresh_pending",
            GateState::Refreshed => "refreshed",
            GateState::Rejected => "rejected",
        }
    }
}

/// Result of credential resolution for one request.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Terminal state reached.
    pub state: GateState,
    /// Subject of the credential in force, if any.
    pub identity: Option<RequestIdentity>,
    /// Credential to use for the rest of the request (refreshed if applicable).
    pub access_token: Option<AccessCredential>,
    /// Cookie mutations to apply to the response.
    pub cookies: Vec<CookieChange>,
    /// Failure that led to `Rejected`, if any.
    pub failure: Option<GateError>,
}

/// What the pipeline should do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow(Option<RequestIdentity>),
    Reject { location: String },
}

/// Validates or refreshes the caller's credentials and guards protected routes.
pub struct SessionGate<S> {
    service: S,
    routes: RouteTable,
    access_cookie: String,
    refresh_cookie: String,
    access_max_age_secs: u64,
    subject_claim: String,
    landing_path: String,
    call_timeout: Duration,
    cookie_attrs: CookieAttributes,
}

impl<S> SessionGate<S> {
    /// Create a gate; `call_timeout` bounds each verify/refresh call.
    pub fn new(service: S, config: &SessionConfig, call_timeout: Duration) -> Self {
        Self {
            service,
            routes: RouteTable::new(config.public_paths.iter().cloned()),
            access_cookie: config.access_cookie.clone(),
            refresh_cookie: config.refresh_cookie.clone(),
            access_max_age_secs: config.access_max_age_secs,
            subject_claim: config.subject_claim.clone(),
            landing_path: config.landing_path.clone(),
            call_timeout,
            cookie_attrs: CookieAttributes {
                path: "/".to_string(),
                secure: config.secure,
            },
        }
    }

    pub fn cookie_attributes(&self) -> &CookieAttributes {
        &self.cookie_attrs
    }

    /// Deletions for both credential cookies.
    pub fn clear_credentials(&self) -> Vec<CookieChange> {
        vec![
            CookieChange::Delete {
                name: self.access_cookie.clone(),
            },
            CookieChange::Delete {
                name: self.refresh_cookie.clone(),
            },
        ]
    }

    /// Decide whether a request for `path` may proceed.
    pub fn authorize(&self, path: &str, identity: Option<RequestIdentity>) -> GateDecision {
        if identity.is_none() && !self.routes.is_public(path) {
            let err = GateError::UnauthorizedRouteAccess(path.to_string());
            tracing::warn!(path = %path, error = %err, "Unauthorized access attempt");
            return GateDecision::Reject {
                location: self.landing_path.clone(),
            };
        }
        GateDecision::Allow(identity)
    }
}

impl<S: CredentialService> SessionGate<S> {
    /// Establish the request identity from the cookies in `jar`.
    ///
    /// Makes at most two upstream calls, verify then refresh, never both
    /// at once. Any failure, including a timeout, fails closed.
    pub async fn resolve(&self, jar: &CookieJar) -> Resolution {
        let access = jar.get(&self.access_cookie).map(AccessCredential::new);
        let refresh = jar.get(&self.refresh_cookie).map(RefreshCredential::new);

        let mut state = if access.is_some() {
            GateState::Verifying
        } else {
            GateState::NoCredential
        };
        let mut identity = None;
        let mut access_token = None;
        let mut cookies = Vec::new();
        let mut failure = None;

        match access {
            None => {
                failure = Some(GateError::MissingCredential);
                advance(&mut state, GateState::Rejected);
            }
            Some(token) => {
                match self.verify(&token).await {
                    Ok(()) => {
                        identity = Some(self.identity_of(&token));
                        access_token = Some(token);
                        advance(&mut state, GateState::Verified);
                    }
                    Err(verify_err) => match refresh {
                        None => {
                            failure = Some(verify_err);
                            advance(&mut state, GateState::Rejected);
                        }
                        Some(refresh_token) => {
                            tracing::debug!(error = %verify_err, "Access credential invalid, attempting refresh");
                            advance(&mut state, GateState::RefreshPending);
                            match self.refresh(&refresh_token).await {
                                Ok(fresh) => {
                                    let subject = self.identity_of(&fresh);
                                    tracing::info!(user = %subject, "Access credential refreshed");
                                    cookies.push(CookieChange::Set {
                                        name: self.access_cookie.clone(),
                                        value: fresh.as_str().to_string(),
                                        max_age_secs: self.access_max_age_secs,
                                    });
                                    identity = Some(subject);
                                    access_token = Some(fresh);
                                    advance(&mut state, GateState::Refreshed);
                                }
                                Err(refresh_err) => {
                                    failure = Some(refresh_err);
                                    advance(&mut state, GateState::Rejected);
                                }
                            }
                        }
                    },
                }
            }
        }

        debug_assert!(state.is_terminal());
        if state == GateState::Rejected {
            cookies = self.clear_credentials();
            if let Some(err) = &failure {
                tracing::debug!(error = %err, "No request identity");
            }
        }

        Resolution {
            state,
            identity,
            access_token,
            cookies,
            failure,
        }
    }

    async fn verify(&self, token: &AccessCredential) -> Result<(), GateError> {
        match tokio::time::timeout(self.call_timeout, self.service.verify(token)).await {
            Err(_) => Err(GateError::VerificationFailed(format!(
                "timed out after {:?}",
                self.call_timeout
            ))),
            Ok(result) => result.map_err(|e| GateError::VerificationFailed(e.to_string())),
        }
    }

    async fn refresh(&self, token: &RefreshCredential) -> Result<AccessCredential, GateError> {
        match tokio::time::timeout(self.call_timeout, self.service.refresh(token)).await {
            Err(_) => Err(GateError::RefreshFailed(format!(
                "timed out after {:?}",
                self.call_timeout
            ))),
            Ok(result) => result.map_err(|e| GateError::RefreshFailed(e.to_string())),
        }
    }

    /// Identity for a credential the upstream has just accepted.
    fn identity_of(&self, token: &AccessCredential) -> RequestIdentity {
        token.subject(&self.subject_claim).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Accepted credential has no readable subject");
            RequestIdentity::unnamed()
        })
    }
}

fn advance(state: &mut GateState, next: GateState) {
    debug_assert!(state.can_advance_to(next), "{state:?} -> {next:?}");
    tracing::debug!(from = state.as_str(), to = next.as_str(), "Session gate transition");
    *state = next;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::session::credential::test_token;
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    impl<S> SessionGate<S> {
        pub(crate) fn service(&self) -> &S {
            &self.service
        }
    }

    /// Scripted credential service that counts calls.
    #[derive(Default)]
    pub(crate) struct FakeService {
        pub valid_access: Vec<String>,
        pub valid_refresh: Vec<(String, String)>,
        pub stall: Option<Duration>,
        pub verify_calls: AtomicUsize,
        pub refresh_calls: AtomicUsize,
    }

    impl CredentialService for FakeService {
        async fn verify(&self, token: &AccessCredential) -> Result<(), UpstreamError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            if self.valid_access.iter().any(|t| t == token.as_str()) {
                Ok(())
            } else {
                Err(UpstreamError::Status(StatusCode::UNAUTHORIZED))
            }
        }

        async fn refresh(&self, token: &RefreshCredential) -> Result<AccessCredential, UpstreamError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.valid_refresh
                .iter()
                .find(|(r, _)| r == token.as_str())
                .map(|(_, access)| AccessCredential::new(access.clone()))
                .ok_or(UpstreamError::Status(StatusCode::UNAUTHORIZED))
        }
    }

    pub(crate) fn gate(service: FakeService) -> SessionGate<FakeService> {
        SessionGate::new(service, &SessionConfig::default(), Duration::from_secs(5))
    }

    fn jar(cookie: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        CookieJar::from_headers(&headers)
    }

    fn cleared() -> Vec<CookieChange> {
        vec![
            CookieChange::Delete { name: "accessToken".into() },
            CookieChange::Delete { name: "refreshToken".into() },
        ]
    }

    #[tokio::test]
    async fn test_valid_access_sets_identity_without_cookie_changes() {
        let token = test_token(json!({"user_id": 7}));
        let gate = gate(FakeService {
            valid_access: vec![token.clone()],
            ..Default::default()
        });

        let res = gate.resolve(&jar(&format!("accessToken={token}; refreshToken=r1"))).await;

        assert_eq!(res.state, GateState::Verified);
        assert_eq!(res.identity, Some(RequestIdentity::new("7")));
        assert!(res.cookies.is_empty());
        assert!(res.failure.is_none());
        assert_eq!(gate.service().refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_access_with_valid_refresh() {
        let fresh = test_token(json!({"user_id": 9}));
        let gate = gate(FakeService {
            valid_refresh: vec![("r1".into(), fresh.clone())],
            ..Default::default()
        });

        let res = gate.resolve(&jar("accessToken=expired.tok.en; refreshToken=r1")).await;

        assert_eq!(res.state, GateState::Refreshed);
        assert_eq!(res.identity, Some(RequestIdentity::new("9")));
        assert_eq!(res.access_token, Some(AccessCredential::new(fresh.clone())));
        assert_eq!(
            res.cookies,
            vec![CookieChange::Set {
                name: "accessToken".into(),
                value: fresh,
                max_age_secs: 3600,
            }]
        );
    }

    #[tokio::test]
    async fn test_expired_access_without_refresh_is_rejected() {
        let gate = gate(FakeService::default());

        let res = gate.resolve(&jar("accessToken=expired.tok.en")).await;

        assert_eq!(res.state, GateState::Rejected);
        assert!(res.identity.is_none());
        assert_eq!(res.cookies, cleared());
        assert!(matches!(res.failure, Some(GateError::VerificationFailed(_))));
        assert_eq!(gate.service().refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_refresh_is_rejected() {
        let gate = gate(FakeService::default());

        let res = gate.resolve(&jar("accessToken=expired.tok.en; refreshToken=stale")).await;

        assert_eq!(res.state, GateState::Rejected);
        assert!(res.identity.is_none());
        assert!(res.access_token.is_none());
        assert_eq!(res.cookies, cleared());
        assert!(matches!(res.failure, Some(GateError::RefreshFailed(_))));
    }

    #[tokio::test]
    async fn test_refresh_cookie_alone_is_not_used() {
        let gate = gate(FakeService {
            valid_refresh: vec![("r1".into(), test_token(json!({"user_id": 1})))],
            ..Default::default()
        });

        let res = gate.resolve(&jar("refreshToken=r1")).await;

        assert_eq!(res.state, GateState::Rejected);
        assert_eq!(res.failure, Some(GateError::MissingCredential));
        assert_eq!(res.cookies, cleared());
        assert_eq!(gate.service().verify_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gate.service().refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_is_idempotent() {
        let gate = gate(FakeService::default());
        let empty = CookieJar::default();

        let first = gate.resolve(&empty).await;
        let second = gate.resolve(&empty).await;

        assert_eq!(first.state, GateState::Rejected);
        assert_eq!(second.state, GateState::Rejected);
        assert_eq!(first.cookies, second.cookies);
        assert_eq!(second.cookies, cleared());
        assert!(second.identity.is_none());
    }

    #[tokio::test]
    async fn test_verified_token_without_subject_is_unnamed() {
        let bare = test_token(json!({"exp": 1}));
        let gate = gate(FakeService {
            valid_access: vec![bare.clone()],
            valid_refresh: vec![("r1".into(), test_token(json!({"user_id": 2})))],
            ..Default::default()
        });

        let res = gate.resolve(&jar(&format!("accessToken={bare}; refreshToken=r1"))).await;

        assert_eq!(res.state, GateState::Verified);
        assert_eq!(res.identity, Some(RequestIdentity::unnamed()));
        assert!(res.cookies.is_empty());
        assert_eq!(gate.service().refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_opaque_refreshed_token_is_kept() {
        let gate = gate(FakeService {
            valid_refresh: vec![("r1".into(), "tok123".into())],
            ..Default::default()
        });

        let res = gate.resolve(&jar("accessToken=old; refreshToken=r1")).await;

        assert_eq!(res.state, GateState::Refreshed);
        assert_eq!(res.identity, Some(RequestIdentity::unnamed()));
        assert_eq!(res.access_token, Some(AccessCredential::new("tok123")));
        assert_eq!(
            res.cookies,
            vec![CookieChange::Set {
                name: "accessToken".into(),
                value: "tok123".into(),
                max_age_secs: 3600,
            }]
        );
        assert_eq!(
            gate.authorize("/dashboard", res.identity.clone()),
            GateDecision::Allow(Some(RequestIdentity::unnamed()))
        );
    }

    #[tokio::test]
    async fn test_slow_verification_times_out() {
        let token = test_token(json!({"user_id": 3}));
        let gate = SessionGate::new(
            FakeService {
                valid_access: vec![token.clone()],
                stall: Some(Duration::from_secs(10)),
                ..Default::default()
            },
            &SessionConfig::default(),
            Duration::from_millis(50),
        );

        let res = gate.resolve(&jar(&format!("accessToken={token}"))).await;

        assert_eq!(res.state, GateState::Rejected);
        match res.failure {
            Some(GateError::VerificationFailed(reason)) => assert!(reason.contains("timed out")),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_authorize() {
        let gate = gate(FakeService::default());
        let user = Some(RequestIdentity::new("1"));

        assert_eq!(
            gate.authorize("/dashboard", None),
            GateDecision::Reject { location: "/".into() }
        );
        assert_eq!(gate.authorize("/dashboard", user.clone()), GateDecision::Allow(user));
        for path in ["/", "/login", "/register"] {
            assert_eq!(gate.authorize(path, None), GateDecision::Allow(None));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(GateState::Verified.is_terminal());
        assert!(GateState::Refreshed.is_terminal());
        assert!(GateState::Rejected.is_terminal());
        assert!(!GateState::Verifying.is_terminal());
        assert!(!GateState::RefreshPending.is_terminal());
        assert!(!GateState::NoCredential.is_terminal());
    }

    #[test]
    fn test_transitions() {
        use GateState::*;
        assert!(NoCredential.can_advance_to(Rejected));
        assert!(!NoCredential.can_advance_to(Verifying));
        assert!(Verifying.can_advance_to(RefreshPending));
        assert!(!Verifying.can_advance_to(Refreshed));
        assert!(RefreshPending.can_advance_to(Refreshed));
        for terminal in [Verified, Refreshed, Rejected] {
            for next in [NoCredential, Verifying, Verified, RefreshPending, Refreshed, Rejected] {
                assert!(!terminal.can_advance_to(next));
            }
        }
    }
}
