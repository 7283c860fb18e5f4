//! Backend-for-frontend gateway library.
//!
//! Authenticates browser sessions held in credential cookies, keeps them
//! fresh against the upstream token service, guards protected routes, and
//! relays authenticated API calls upstream.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod session;
pub mod upstream;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
