//! Accepted connections and their registry lease.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Bundle an accepted stream with its peer address
//! - Release the registry entry before the socket closes, on every exit path

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::net::registry::ConnectionRegistry;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One accepted socket, owned by the handler task spawned for it.
///
/// Fields drop in declaration order, so the registry lease is released
/// before the stream is closed even when the task unwinds.
#[derive(Debug)]
pub struct Connection {
    lease: ConnectionGuard,
    peer_addr: SocketAddr,
    stream: TcpStream,
}

impl Connection {
    pub(crate) fn new(lease: ConnectionGuard, stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            lease,
            peer_addr,
            stream,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.lease.id()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Deregister, then shut down and close the underlying socket.
    pub async fn close(self) {
        let Connection {
            lease, mut stream, ..
        } = self;
        let id = lease.id();
        drop(lease);

        if let Err(e) = stream.shutdown().await {
            tracing::trace!(connection_id = %id, error = %e, "Shutdown on closed socket");
        }
    }
}

/// Registry lease for one open connection.
/// Deregisters the connection when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub(crate) fn new(registry: Arc<ConnectionRegistry>, id: ConnectionId) -> Self {
        Self { registry, id }
    }

    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
        tracing::trace!(connection_id = %self.id, "Connection released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId(42);
        assert_eq!(id.to_string(), "conn-42");
    }
}
