//! State shared by the facade, the acceptor and the handlers.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};

use crate::lifecycle::Shutdown;
use crate::net::listener::AcceptorExit;
use crate::net::registry::ConnectionRegistry;

/// The listening socket itself is owned by the acceptor task, which closes
/// it when its loop ends.
#[derive(Debug, Default)]
pub(crate) struct ServerState {
    pub(crate) shutdown: Arc<Shutdown>,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) started: AtomicBool,
    pub(crate) local_addr: OnceLock<SocketAddr>,
    /// Why the acceptor stopped, set once its loop has ended.
    pub(crate) exit: OnceLock<AcceptorExit>,
}

impl ServerState {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}
