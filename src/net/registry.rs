//! Connection registry.
//!
//! Bookkeeping for open connections and in-flight handler tasks. This is the
//! only shared mutable state between the acceptor and the handlers, and the
//! single place that answers "how many connections are open".

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::net::connection::{ConnectionGuard, ConnectionId};
use crate::observability::metrics;

#[derive(Debug, Default)]
struct Entries {
    open: HashMap<ConnectionId, SocketAddr>,
    tasks: Vec<JoinHandle<()>>,
}

/// Thread-safe set of open connections and running handler tasks.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Mutex<Entries>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panicking handler must not wedge shutdown.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection and the task that handles it.
    ///
    /// `spawn` receives the connection's lease and must start its handler.
    /// The connection is counted before `spawn` runs, so its handler can
    /// never deregister ahead of the registration.
    pub fn register<F>(self: &Arc<Self>, id: ConnectionId, peer_addr: SocketAddr, spawn: F)
    where
        F: FnOnce(ConnectionGuard) -> JoinHandle<()>,
    {
        {
            let mut entries = self.lock();
            reap_finished(&mut entries.tasks);
            entries.open.insert(id, peer_addr);
            metrics::record_open_connections(entries.open.len());
        }

        // Lock released: a handler dropped during spawn deregisters itself.
        let task = spawn(ConnectionGuard::new(Arc::clone(self), id));
        self.lock().tasks.push(task);
    }

    /// Remove a connection from the open set. Absent ids are ignored.
    pub fn deregister(&self, id: ConnectionId) {
        let mut entries = self.lock();
        if entries.open.remove(&id).is_some() {
            metrics::record_open_connections(entries.open.len());
        }
    }

    /// Current open-connection count.
    pub fn count(&self) -> usize {
        self.lock().open.len()
    }

    /// Handler tasks registered and not yet joined.
    pub fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Wait for every registered handler task to complete.
    ///
    /// Returns the number of tasks joined. Panicked tasks are logged, not propagated.
    pub async fn join_all(&self) -> usize {
        let mut joined = 0;
        loop {
            let tasks = std::mem::take(&mut self.lock().tasks);
            if tasks.is_empty() {
                return joined;
            }

            for task in tasks {
                if let Err(e) = task.await {
                    tracing::warn!(error = %e, "Connection handler did not complete cleanly");
                }
                joined += 1;
            }
        }
    }
}

/// Drop handles of finished tasks, logging any that panicked.
///
/// Returns the number of failed tasks reaped.
fn reap_finished(tasks: &mut Vec<JoinHandle<()>>) -> usize {
    let mut failed = 0;
    tasks.retain_mut(|task| {
        if !task.is_finished() {
            return true;
        }
        if let Some(Err(e)) = task.now_or_never() {
            tracing::warn!(error = %e, "Connection handler did not complete cleanly");
            failed += 1;
        }
        false
    });
    failed
}
