//! TCP acceptor (echo service).
//!
//! Accepts connections on the configured address and writes every received
//! payload back to its sender before closing the connection.

use std::net::SocketAddr;
use std::path::PathBuf;

use async_trait::async_trait;
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use tcp_acceptor::config::{load_config, ServerConfig};
use tcp_acceptor::lifecycle::signals::shutdown_signal;
use tcp_acceptor::observability::{logging, metrics};
use tcp_acceptor::{ConnectionCallback, HandlerError, Server};

#[derive(Parser)]
#[command(name = "tcp-acceptor")]
#[command(about = "Concurrent TCP acceptor echoing each request", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    backlog: Option<u32>,

    #[arg(long)]
    max_connections: Option<usize>,

    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(backlog) = self.backlog {
            config.backlog = backlog;
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

struct Echo;

#[async_trait]
impl ConnectionCallback<Vec<u8>> for Echo {
    async fn on_connection(
        &self,
        request: Result<Vec<u8>, HandlerError>,
        stream: &mut TcpStream,
        peer_addr: SocketAddr,
    ) {
        match request {
            Ok(payload) => {
                if let Err(e) = stream.write_all(&payload).await {
                    tracing::debug!(peer_addr = %peer_addr, error = %e, "Echo write failed");
                }
            }
            Err(e) => tracing::debug!(peer_addr = %peer_addr, error = %e, "Nothing to echo"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();

    let mut config = match cli.config.take() {
        Some(path) => load_config(&path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);

    logging::init(&config.observability)?;
    tracing::info!("tcp-acceptor v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = Server::new(config, Echo);
    if !server.is_enabled() {
        return Err("invalid configuration, see log for details".into());
    }

    server.start().await?;

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = server.wait() => tracing::warn!("Server stopped on its own"),
    }

    server.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
