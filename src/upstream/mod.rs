//! Upstream API subsystem.
//!
//! # Data Flow
//! ```text
//! session gate ──verify/refresh──▶ client.rs ──▶ POST <base>/token/verify/
//!                                              ──▶ POST <base>/token/refresh/
//! login handler ──obtain_pair───▶ client.rs ──▶ POST <base>/token/
//! api relay ─────relay──────────▶ client.rs ──▶ ANY  <base>/<path> (Bearer)
//! ```
//!
//! # Design Decisions
//! - One pooled reqwest client, shared by clone
//! - Every call has a deadline; a timeout is just another failure
//! - The gateway never issues, signs or rotates tokens

pub mod client;
pub mod error;

pub use client::{RelayRequest, TokenPair, UpstreamClient};
pub use error::UpstreamError;
