//! Per-connection handling.
//!
//! # Responsibilities
//! - Pull bytes from the connection within the configured timeout
//! - Decode them into a request
//! - Hand the request (or the failure) to the application callback
//! - Deregister and close the connection on every exit path

use std::sync::Arc;
use std::time::Duration;

use crate::net::connection::Connection;
use crate::observability::metrics;
use crate::protocol::{ByteTransfer, ConnectionCallback, HandlerError, RequestDecoder};

/// Collaborators shared by every handler task of one server.
pub(crate) struct ConnectionHandler<D: RequestDecoder> {
    transfer: Arc<dyn ByteTransfer>,
    decoder: D,
    callback: Arc<dyn ConnectionCallback<D::Request>>,
    timeout: Duration,
}

impl<D: RequestDecoder> ConnectionHandler<D> {
    pub(crate) fn new(
        transfer: Arc<dyn ByteTransfer>,
        decoder: D,
        callback: Arc<dyn ConnectionCallback<D::Request>>,
        timeout: Duration,
    ) -> Self {
        Self {
            transfer,
            decoder,
            callback,
            timeout,
        }
    }

    /// Run one connection to completion.
    ///
    /// The connection owns its registry lease, so a panic in the callback
    /// still deregisters it while the task unwinds.
    pub(crate) async fn handle(self: Arc<Self>, mut connection: Connection) {
        let id = connection.id();
        let peer_addr = connection.peer_addr();

        let request = self.read_request(&mut connection).await;
        if let Err(e) = &request {
            metrics::record_handler_failure(e.kind());
            tracing::debug!(
                connection_id = %id,
                peer_addr = %peer_addr,
                error = %e,
                "No request decoded"
            );
        }

        self.callback
            .on_connection(request, connection.stream_mut(), peer_addr)
            .await;

        connection.close().await;
        tracing::debug!(connection_id = %id, peer_addr = %peer_addr, "Connection closed");
    }

    async fn read_request(&self, connection: &mut Connection) -> Result<D::Request, HandlerError> {
        let bytes = self
            .transfer
            .receive(connection.stream_mut(), self.timeout)
            .await?;
        Ok(self.decoder.decode(&bytes)?)
    }
}
