//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (timed accept loop, concurrency ceiling)
//!     → registry.rs (connection + handler task registered together)
//!     → handler.rs (transfer → decode → callback, on its own task)
//!     → connection.rs (lease released, socket closed)
//!
//! Acceptor States:
//!     Running → CapacityPaused → Stopped
//!     Running → Stopped
//! ```
//!
//! # Design Decisions
//! - Accept is bounded by the configured timeout so stop requests are seen
//! - Each connection is deregistered and closed only by its own handler
//! - Reaching the ceiling ends acceptance permanently for the instance

pub mod connection;
pub(crate) mod handler;
pub mod listener;
pub mod registry;

pub use connection::{Connection, ConnectionGuard, ConnectionId};
pub use listener::{AcceptorExit, Listener, ListenerError};
pub use registry::ConnectionRegistry;
