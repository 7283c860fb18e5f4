//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse CLI → Load config → Validate → Init logging/metrics → Bind → Serve
//!
//! Shutdown (shutdown.rs + signals.rs):
//!     SIGTERM/SIGINT or Shutdown::trigger → Stop accepting → Drain in-flight → Exit
//! ```
//!
//! # Design Decisions
//! - Trigger is a latch (`watch`), not an event; late waiters still see it
//! - The wait reports its reason so the drain is logged with its cause

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownReason, ShutdownSignal};
