//! Byte transfer: pull whatever the peer has sent, bounded by a deadline.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

/// Error type for transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Nothing arrived before the deadline.
    #[error("no data within {0:?}")]
    Timeout(Duration),
    /// Peer closed the connection before sending anything.
    #[error("connection closed by peer")]
    Closed,
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads the bytes available on a connection.
#[async_trait]
pub trait ByteTransfer: Send + Sync + 'static {
    async fn receive(
        &self,
        stream: &mut TcpStream,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransferError>;
}

/// Single bounded read with a timeout.
#[derive(Debug, Clone)]
pub struct TimedRead {
    buffer_size: usize,
}

impl TimedRead {
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }
}

impl Default for TimedRead {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[async_trait]
impl ByteTransfer for TimedRead {
    async fn receive(
        &self,
        stream: &mut TcpStream,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransferError> {
        let mut buf = vec![0u8; self.buffer_size];
        let n = tokio::time::timeout(timeout, stream.read(&mut buf))
            .await
            .map_err(|_| TransferError::Timeout(timeout))??;

        if n == 0 {
            return Err(TransferError::Closed);
        }
        buf.truncate(n);
        Ok(buf)
    }
}
