//! Collaborator seams between the acceptor core and application code.
//!
//! # Data Flow
//! ```text
//! accepted TcpStream
//!     → transfer.rs (ByteTransfer: bytes within a deadline)
//!     → decoder.rs (RequestDecoder: bytes → request)
//!     → callback.rs (ConnectionCallback: request or failure, stream, peer)
//! ```
//!
//! # Design Decisions
//! - Each seam is a trait so applications can swap in their own wire handling
//! - Failures are handed to the callback, never raised past the handler

pub mod callback;
pub mod decoder;
pub mod transfer;

pub use callback::{ConnectionCallback, HandlerError};
pub use decoder::{DecodeError, JsonDecoder, RawDecoder, RequestDecoder};
pub use transfer::{ByteTransfer, TimedRead, TransferError};
