//! Concurrent TCP connection acceptor.
//!
//! Listens on one address, accepts connections up to a concurrency ceiling,
//! runs each connection on its own task and stops only once every handler
//! has finished.
//!
//! ```no_run
//! use tcp_acceptor::{HandlerError, Server, ServerConfig};
//! use tokio::net::TcpStream;
//!
//! fn on_connection(request: Result<Vec<u8>, HandlerError>, _: &mut TcpStream, peer: std::net::SocketAddr) {
//!     println!("{peer}: {:?}", request.map(|bytes| bytes.len()));
//! }
//!
//! # async fn run() -> Result<(), tcp_acceptor::ServerError> {
//! let server = Server::new(ServerConfig::default(), on_connection);
//! server.start().await?;
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod server;

pub use config::ServerConfig;
pub use lifecycle::Shutdown;
pub use protocol::{
    ByteTransfer, ConnectionCallback, DecodeError, HandlerError, JsonDecoder, RawDecoder,
    RequestDecoder, TimedRead, TransferError,
};
pub use server::{Server, ServerError};
