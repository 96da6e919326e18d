//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

use tcp_acceptor::{ConnectionCallback, HandlerError, ServerConfig};

/// Loopback config on `port` with a short timeout to keep tests fast.
pub fn test_config(port: u16) -> ServerConfig {
    ServerConfig {
        port,
        timeout_ms: 100,
        ..ServerConfig::default()
    }
}

/// Poll `condition` until it holds or `limit` passes.
pub async fn wait_until<F: Fn() -> bool>(condition: F, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Connect and send `payload`, keeping the stream open.
pub async fn send(addr: SocketAddr, payload: &[u8]) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream
}

/// Read until the server closes the connection.
pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut buf))
        .await
        .expect("server did not close the connection")
        .unwrap();
    buf
}

/// One callback invocation.
#[derive(Debug)]
pub struct Call {
    pub request: Result<Vec<u8>, HandlerError>,
    pub peer_addr: SocketAddr,
}

struct Inner {
    calls: Mutex<Vec<Call>>,
    entered: AtomicUsize,
    gate: Option<watch::Sender<bool>>,
    delay: Option<Duration>,
    reply: Option<&'static [u8]>,
}

/// Callback that records every invocation. Clones share the record.
#[derive(Clone)]
pub struct Recorder {
    inner: Arc<Inner>,
}

impl Recorder {
    fn build(gate: bool, delay: Option<Duration>, reply: Option<&'static [u8]>) -> Self {
        Self {
            inner: Arc::new(Inner {
                calls: Mutex::new(Vec::new()),
                entered: AtomicUsize::new(0),
                gate: gate.then(|| watch::Sender::new(false)),
                delay,
                reply,
            }),
        }
    }

    pub fn new() -> Self {
        Self::build(false, None, None)
    }

    /// Callbacks block until [`Recorder::open_gate`].
    pub fn gated() -> Self {
        Self::build(true, None, None)
    }

    pub fn slow(delay: Duration) -> Self {
        Self::build(false, Some(delay), None)
    }

    /// Writes `reply` back on every decoded request.
    pub fn replying(reply: &'static [u8]) -> Self {
        Self::build(false, None, Some(reply))
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.inner.gate {
            gate.send_replace(true);
        }
    }

    /// Callbacks started so far.
    pub fn entered(&self) -> usize {
        self.inner.entered.load(Ordering::SeqCst)
    }

    /// Callbacks finished so far.
    pub fn completed(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.inner.calls.lock().unwrap())
    }
}

#[async_trait]
impl ConnectionCallback<Vec<u8>> for Recorder {
    async fn on_connection(
        &self,
        request: Result<Vec<u8>, HandlerError>,
        stream: &mut TcpStream,
        peer_addr: SocketAddr,
    ) {
        self.inner.entered.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.inner.gate {
            let mut rx = gate.subscribe();
            let _ = rx.wait_for(|open| *open).await;
        }
        if let Some(delay) = self.inner.delay {
            tokio::time::sleep(delay).await;
        }
        if let (Ok(_), Some(reply)) = (&request, self.inner.reply) {
            stream.write_all(reply).await.unwrap();
        }

        self.inner
            .calls
            .lock()
            .unwrap()
            .push(Call { request, peer_addr });
    }
}
