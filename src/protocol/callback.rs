//! Application callback invoked once per accepted connection.

use std::net::SocketAddr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::protocol::decoder::DecodeError;
use crate::protocol::transfer::TransferError;

/// Why no request could be produced for a connection.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl HandlerError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::Transfer(_) => "transfer",
            HandlerError::Decode(_) => "decode",
        }
    }
}

/// User code run on the connection's own task.
///
/// The server closes the stream after this returns.
#[async_trait]
pub trait ConnectionCallback<R: Send + 'static>: Send + Sync + 'static {
    async fn on_connection(
        &self,
        request: Result<R, HandlerError>,
        stream: &mut TcpStream,
        peer_addr: SocketAddr,
    );
}

#[async_trait]
impl<R, F> ConnectionCallback<R> for F
where
    R: Send + 'static,
    F: Fn(Result<R, HandlerError>, &mut TcpStream, SocketAddr) + Send + Sync + 'static,
{
    async fn on_connection(
        &self,
        request: Result<R, HandlerError>,
        stream: &mut TcpStream,
        peer_addr: SocketAddr,
    ) {
        self(request, stream, peer_addr)
    }
}
