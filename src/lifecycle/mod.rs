//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     stop() or acceptor exit → clear running → acceptor closes listener
//!         → join handlers → stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop()
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, close listener, drain handlers
//! - Exactly one caller runs the sequence; others wait for it
//! - No forced exit: stop waits for the slowest handler

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
