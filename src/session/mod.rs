//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → cookie.rs (read accessToken / refreshToken)
//!     → gate.rs (resolve identity: verify, then maybe refresh)
//!     → routes.rs (public or protected?)
//!     → middleware.rs: Allow → SessionContext + downstream handler
//!                      Reject → 302 to landing path
//!     → cookie.rs (Set-Cookie for refreshed or cleared credentials)
//! ```
//!
//! # State Machine (per request, never persisted)
//! ```text
//! NoCredential   → Rejected
//! Verifying      → Verified | RefreshPending | Rejected
//! RefreshPending → Refreshed | Rejected
//! ```
//! `Verified`, `Refreshed` and `Rejected` are terminal. `Rejected` always
//! deletes both credential cookies.
//!
//! # Design Decisions
//! - Fail closed: timeouts, transport errors and non-2xx replies all reject
//! - No retries; at most one verify and one refresh call per request
//! - Claims are decoded only after the upstream vouched for the token; an
//!   unreadable subject gives an unnamed identity, never a rejection
//! - Refresh credentials are never rotated by the gate

pub mod cookie;
pub mod credential;
pub mod gate;
pub mod middleware;
pub mod routes;

pub use cookie::{CookieChange, CookieJar};
pub use credential::{AccessCredential, RefreshCredential, RequestIdentity};
pub use gate::{CredentialService, GateDecision, GateError, GateState, Resolution, SessionGate};
pub use middleware::{session_gate_middleware, SessionContext};
pub use routes::RouteTable;
