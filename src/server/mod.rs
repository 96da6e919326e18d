//! Server facade.
//!
//! # Responsibilities
//! - Validate configuration at construction
//! - Bind, listen and launch the acceptor task on `start`
//! - Drive the stop sequence on `stop`
//!
//! # Design Decisions
//! - An invalid configuration yields a disabled server whose `start`/`stop`
//!   are no-ops, not an error
//! - Single-use: a stopped server cannot be started again

pub(crate) mod state;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{validate_config, ServerConfig};
use crate::lifecycle::shutdown;
use crate::net::handler::ConnectionHandler;
use crate::net::listener::{Acceptor, AcceptorExit, Listener, ListenerError};
use crate::protocol::{ByteTransfer, ConnectionCallback, RawDecoder, RequestDecoder, TimedRead};
use state::ServerState;

/// Error type for server lifecycle operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server already started or stopped")]
    AlreadyStarted,
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Concurrent TCP acceptor.
///
/// Accepts connections up to `max_connections`, runs each on its own task
/// through the transfer → decode → callback pipeline, and on `stop` waits
/// for every handler to finish.
pub struct Server<D: RequestDecoder = RawDecoder> {
    config: ServerConfig,
    enabled: bool,
    state: Arc<ServerState>,
    handler: Arc<ConnectionHandler<D>>,
}

impl Server<RawDecoder> {
    /// Server handing raw received bytes to `callback`.
    pub fn new<C>(config: ServerConfig, callback: C) -> Self
    where
        C: ConnectionCallback<Vec<u8>>,
    {
        let transfer = TimedRead::new(config.read_buffer_size);
        Self::with_collaborators(config, transfer, RawDecoder, callback)
    }
}

impl<D: RequestDecoder> Server<D> {
    /// Server with custom transfer and decode collaborators.
    pub fn with_collaborators<T, C>(config: ServerConfig, transfer: T, decoder: D, callback: C) -> Self
    where
        T: ByteTransfer,
        C: ConnectionCallback<D::Request>,
    {
        let enabled = match validate_config(&config) {
            Ok(()) => true,
            Err(errors) => {
                for error in &errors {
                    tracing::warn!(%error, "Invalid server configuration");
                }
                tracing::warn!("Server disabled, start and stop will do nothing");
                false
            }
        };

        let handler = Arc::new(ConnectionHandler::new(
            Arc::new(transfer),
            decoder,
            Arc::new(callback),
            config.timeout(),
        ));

        Self {
            config,
            enabled,
            state: Arc::new(ServerState::new()),
            handler,
        }
    }

    /// Bind, listen and launch the acceptor task.
    ///
    /// Bind failures are logged and returned; the server can then be
    /// started again or stopped.
    pub async fn start(&self) -> Result<(), ServerError> {
        if !self.enabled {
            tracing::debug!("Ignoring start on disabled server");
            return Ok(());
        }
        if self.state.shutdown.is_stopped()
            || !self.state.shutdown.is_running()
            || self.state.started.swap(true, Ordering::SeqCst)
        {
            return Err(ServerError::AlreadyStarted);
        }

        let bound = Listener::bind(&self.config).await;

        // A stop that completed while binding wins; drop the socket unused.
        if !self.state.shutdown.is_running() {
            tracing::debug!("Stopped during bind, closing listener");
            return Err(ServerError::AlreadyStarted);
        }

        let listener = match bound {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(address = %self.config.bind_address(), error = %e, "Error while starting server");
                self.state.started.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        if let Ok(addr) = listener.local_addr() {
            let _ = self.state.local_addr.set(addr);
        }

        let acceptor = Acceptor::new(
            listener,
            Arc::clone(&self.state),
            Arc::clone(&self.handler),
            &self.config,
        );
        let guard = self.state.shutdown.acceptor_guard();
        tokio::spawn(async move {
            let _guard = guard;
            acceptor.run().await
        });

        Ok(())
    }

    /// Stop accepting, close the listener and wait for every handler.
    ///
    /// Idempotent: later calls return once the first has completed.
    pub async fn stop(&self) {
        if !self.enabled {
            return;
        }
        shutdown::stop(&self.state.shutdown, &self.state.registry).await;
    }

    /// Wait until the server has stopped, whoever triggered it.
    ///
    /// Never resolves for an enabled server that is neither stopped nor
    /// stopping on its own.
    pub async fn wait(&self) {
        if !self.enabled {
            return;
        }
        self.state.shutdown.wait_stopped().await;
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// False when construction rejected the configuration.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True between a successful `start` and the first stop request.
    pub fn is_running(&self) -> bool {
        self.enabled
            && self.state.started.load(Ordering::SeqCst)
            && self.state.shutdown.is_running()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.shutdown.is_stopped()
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.state.local_addr.get().copied()
    }

    /// Connections accepted and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.state.registry.count()
    }

    /// Why the acceptor stopped: owner stop, capacity or a fatal accept
    /// error. `None` while it is still accepting or was never started.
    pub fn exit_reason(&self) -> Option<&AcceptorExit> {
        self.state.exit.get()
    }
}

impl<D: RequestDecoder> Drop for Server<D> {
    /// A dropped server stops accepting on its next accept timeout; the
    /// acceptor then closes the listener and drains the handlers itself.
    fn drop(&mut self) {
        self.state.shutdown.request_stop();
    }
}
