//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured address with the configured backlog
//! - Accept incoming TCP connections, one timed attempt at a time
//! - Stop accepting once the concurrency ceiling is exceeded
//! - Treat non-timeout accept errors as fatal to the loop

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::config::ServerConfig;
use crate::lifecycle::shutdown;
use crate::net::connection::{Connection, ConnectionId};
use crate::net::handler::ConnectionHandler;
use crate::observability::metrics;
use crate::protocol::RequestDecoder;
use crate::server::state::ServerState;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to resolve or bind the address.
    #[error("Failed to bind: {0}")]
    Bind(#[source] std::io::Error),
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
}

/// A bound, listening TCP socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Resolve, bind and listen on the configured address.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ListenerError> {
        let addr = tokio::net::lookup_host(config.bind_address())
            .await
            .map_err(ListenerError::Bind)?
            .next()
            .ok_or_else(|| {
                ListenerError::Bind(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("{} did not resolve", config.bind_address()),
                ))
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(ListenerError::Bind)?;

        socket.set_reuseaddr(true).map_err(ListenerError::Bind)?;
        socket.bind(addr).map_err(ListenerError::Bind)?;
        let inner = socket.listen(config.backlog).map_err(ListenerError::Bind)?;
        let local_addr = inner.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            backlog = config.backlog,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self { inner })
    }

    /// Accept one connection, giving up after `timeout`.
    ///
    /// `Ok(None)` means the timeout elapsed with nobody connecting.
    pub async fn accept_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<(TcpStream, SocketAddr)>, ListenerError> {
        match tokio::time::timeout(timeout, self.inner.accept()).await {
            Err(_elapsed) => Ok(None),
            Ok(accepted) => accepted.map(Some).map_err(ListenerError::Accept),
        }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}

/// Why the accept loop ended.
#[derive(Debug)]
pub enum AcceptorExit {
    /// The running flag was cleared.
    Stopped,
    /// Open connections exceeded the ceiling; acceptance ends for good.
    CapacityPaused { open: usize },
    /// The listening socket returned a non-timeout error.
    Failed(ListenerError),
}

/// Owns the listening socket for the lifetime of the accept loop.
pub(crate) struct Acceptor<D: RequestDecoder> {
    listener: Listener,
    state: Arc<ServerState>,
    handler: Arc<ConnectionHandler<D>>,
    max_connections: usize,
    timeout: Duration,
}

impl<D: RequestDecoder> Acceptor<D> {
    pub(crate) fn new(
        listener: Listener,
        state: Arc<ServerState>,
        handler: Arc<ConnectionHandler<D>>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            listener,
            state,
            handler,
            max_connections: config.max_connections,
            timeout: config.timeout(),
        }
    }

    /// Accept until stopped, then close the socket and, unless the owner
    /// already asked for it, run the stop sequence.
    ///
    /// The exit reason is recorded in the server state before the stop
    /// sequence can complete.
    pub(crate) async fn run(self) {
        let exit = self.accept_loop().await;

        let Acceptor {
            listener, state, ..
        } = self;
        drop(listener);
        tracing::info!(reason = ?exit, "Listener closed");

        let _ = state.exit.set(exit);
        shutdown::stop_from_acceptor(&state.shutdown, &state.registry).await;
    }

    async fn accept_loop(&self) -> AcceptorExit {
        while self.state.shutdown.is_running() {
            let open = self.state.registry.count();
            if open > self.max_connections {
                metrics::record_capacity_reached();
                tracing::warn!(
                    open_connections = open,
                    max_connections = self.max_connections,
                    "Max connections reached, no longer accepting"
                );
                return AcceptorExit::CapacityPaused { open };
            }

            let accepted = self.listener.accept_timeout(self.timeout).await;
            if let Some(exit) = self.on_accept(accepted) {
                return exit;
            }
        }

        AcceptorExit::Stopped
    }

    /// Dispatch an accepted connection. Returns the exit for fatal errors.
    fn on_accept(
        &self,
        accepted: Result<Option<(TcpStream, SocketAddr)>, ListenerError>,
    ) -> Option<AcceptorExit> {
        match accepted {
            Ok(Some((stream, peer_addr))) => {
                self.dispatch(stream, peer_addr);
                None
            }
            // Timeout: loop around and re-check the running flag.
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "Accept failed, stopping acceptor");
                Some(AcceptorExit::Failed(e))
            }
        }
    }

    fn dispatch(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let id = ConnectionId::new();
        let handler = Arc::clone(&self.handler);

        self.state.registry.register(id, peer_addr, move |lease| {
            let connection = Connection::new(lease, stream, peer_addr);
            tokio::spawn(handler.handle(connection))
        });

        metrics::record_accepted();
        tracing::debug!(
            connection_id = %id,
            peer_addr = %peer_addr,
            open_connections = self.state.registry.count(),
            "Connection accepted"
        );
    }
}
