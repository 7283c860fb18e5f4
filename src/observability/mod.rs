//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) set at the edge and echoed to the client
//! - Tokens are never logged; credential types redact themselves in Debug
//! - Metrics are opt-in via config

pub mod logging;
pub mod metrics;
