//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → session gate (identity, redirect, cookie changes)
//!     → handlers.rs (pages, login, logout) | relay.rs (/api/* → upstream)
//!     → Send to client
//! ```

pub mod handlers;
pub mod relay;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
