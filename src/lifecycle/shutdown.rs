//! Shutdown coordination for the server.
//!
//! The stop sequence runs exactly once per server, whether the facade or
//! the acceptor triggers it:
//!
//! 1. Clear the running flag (the acceptor sees it on its next timeout)
//! 2. Wait for the acceptor task to finish
//! 3. The acceptor closes the listening socket as its last act
//! 4. Join every registered handler task

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::net::registry::ConnectionRegistry;

/// Flags and completion signals shared by the facade and the acceptor.
#[derive(Debug)]
pub struct Shutdown {
    /// True until a stop is requested.
    running: AtomicBool,
    /// Set by whichever caller claims the stop sequence.
    claimed: AtomicBool,
    /// True whenever no acceptor task is alive.
    acceptor_idle: watch::Sender<bool>,
    /// True once the stop sequence has fully completed.
    stopped: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            claimed: AtomicBool::new(false),
            acceptor_idle: watch::Sender::new(true),
            stopped: watch::Sender::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True once the stop sequence has completed.
    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Ask the acceptor to stop without waiting for it.
    ///
    /// The acceptor notices on its next accept timeout and runs the stop
    /// sequence itself, unless an owner claims it first.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Claim the stop sequence. Only the first caller gets `true`.
    fn claim(&self) -> bool {
        self.request_stop();
        !self.claimed.swap(true, Ordering::SeqCst)
    }

    fn finish(&self) {
        self.stopped.send_replace(true);
    }

    /// Mark an acceptor task as alive until the returned guard drops.
    pub(crate) fn acceptor_guard(self: &Arc<Self>) -> AcceptorGuard {
        self.acceptor_idle.send_replace(false);
        AcceptorGuard {
            shutdown: Arc::clone(self),
        }
    }

    async fn wait_acceptor(&self) {
        let mut rx = self.acceptor_idle.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|idle| *idle).await;
    }

    /// Wait until the stop sequence has completed.
    pub async fn wait_stopped(&self) {
        let mut rx = self.stopped.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Signals the acceptor task's exit, including on panic or cancellation.
#[derive(Debug)]
pub(crate) struct AcceptorGuard {
    shutdown: Arc<Shutdown>,
}

impl Drop for AcceptorGuard {
    fn drop(&mut self) {
        self.shutdown.acceptor_idle.send_replace(true);
    }
}

/// Stop requested by the server owner. Resolves once quiescent.
pub(crate) async fn stop(shutdown: &Shutdown, registry: &ConnectionRegistry) {
    if !shutdown.claim() {
        // Already stopping or stopped; wait for whoever claimed it.
        shutdown.wait_stopped().await;
        return;
    }

    tracing::info!("Stop requested, waiting for acceptor");
    shutdown.wait_acceptor().await;

    let joined = registry.join_all().await;
    shutdown.finish();
    tracing::info!(handlers_joined = joined, "Server stopped");
}

/// Stop triggered by the acceptor itself after leaving its loop.
///
/// Must not wait on the acceptor, which is the caller.
pub(crate) async fn stop_from_acceptor(shutdown: &Shutdown, registry: &ConnectionRegistry) {
    if !shutdown.claim() {
        return;
    }

    tracing::info!("Acceptor exited on its own, stopping server");
    let joined = registry.join_all().await;
    shutdown.finish();
    tracing::info!(handlers_joined = joined, "Server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn stop_without_acceptor_completes() {
        let shutdown = Shutdown::new();
        let registry = ConnectionRegistry::new();

        stop(&shutdown, &registry).await;
        assert!(!shutdown.is_running());
        assert!(shutdown.is_stopped());
    }

    #[tokio::test]
    async fn second_stop_returns_immediately() {
        let shutdown = Shutdown::new();
        let registry = ConnectionRegistry::new();

        stop(&shutdown, &registry).await;
        tokio::time::timeout(Duration::from_millis(50), stop(&shutdown, &registry))
            .await
            .expect("second stop should not block");
    }

    #[tokio::test]
    async fn stop_waits_for_acceptor_guard() {
        let shutdown = Arc::new(Shutdown::new());
        let registry = Arc::new(ConnectionRegistry::new());

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let guard = shutdown.acceptor_guard();
        let acceptor = tokio::spawn(async move {
            let _guard = guard;
            let _ = release_rx.await;
        });

        let stopper = {
            let shutdown = Arc::clone(&shutdown);
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { stop(&shutdown, &registry).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stopper.is_finished(), "stop returned while acceptor alive");
        assert!(!shutdown.is_running());
        assert!(!shutdown.is_stopped());

        release_tx.send(()).unwrap();
        acceptor.await.unwrap();
        stopper.await.unwrap();
        assert!(shutdown.is_stopped());
    }

    #[tokio::test]
    async fn cancelled_acceptor_still_signals() {
        let shutdown = Arc::new(Shutdown::new());
        let registry = ConnectionRegistry::new();

        let guard = shutdown.acceptor_guard();
        let acceptor = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        acceptor.abort();

        tokio::time::timeout(Duration::from_secs(1), stop(&shutdown, &registry))
            .await
            .expect("aborted acceptor must release stop");
    }

    #[tokio::test]
    async fn acceptor_claim_wins_once() {
        let shutdown = Shutdown::new();
        let registry = ConnectionRegistry::new();

        stop_from_acceptor(&shutdown, &registry).await;
        assert!(shutdown.is_stopped());

        // Owner's stop after an acceptor-initiated stop is a no-op.
        stop(&shutdown, &registry).await;
        assert!(shutdown.is_stopped());
    }
}
