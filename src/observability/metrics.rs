//! Metrics collection and exposition.
//!
//! # Metrics
//! - `acceptor_connections_accepted_total` (counter)
//! - `acceptor_connections_open` (gauge): current registry count
//! - `acceptor_handler_failures_total` (counter): by `kind` (transfer, decode)
//! - `acceptor_capacity_reached_total` (counter)
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const CONNECTIONS_ACCEPTED: &str = "acceptor_connections_accepted_total";
pub const CONNECTIONS_OPEN: &str = "acceptor_connections_open";
pub const HANDLER_FAILURES: &str = "acceptor_handler_failures_total";
pub const CAPACITY_REACHED: &str = "acceptor_capacity_reached_total";

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_accepted() {
    counter!(CONNECTIONS_ACCEPTED).increment(1);
}

pub fn record_open_connections(open: usize) {
    gauge!(CONNECTIONS_OPEN).set(open as f64);
}

pub fn record_handler_failure(kind: &'static str) {
    counter!(HANDLER_FAILURES, "kind" => kind).increment(1);
}

pub fn record_capacity_reached() {
    counter!(CAPACITY_REACHED).increment(1);
}
