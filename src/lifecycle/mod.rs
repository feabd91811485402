//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → server stops accepting, drains in-flight requests
//!               → limiter sweeps exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes
//! - Startup is linear in main: config, logging, metrics, listener, serve

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
