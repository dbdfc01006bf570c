//! Metrics collection and exposition.
//!
//! # Metrics
//! - `finalizer_responses_total` (counter): finalized responses by representation
//! - `finalizer_failures_total` (counter): handler failures by kind
//! - `finalizer_dispatch_duration_seconds` (histogram): time spent in the handler chain
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_response(representation: &'static str, status: u16) {
    metrics::counter!(
        "finalizer_responses_total",
        "representation" => representation,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_failure(kind: &'static str) {
    metrics::counter!("finalizer_failures_total", "kind" => kind).increment(1);
}

pub fn record_dispatch(start: Instant) {
    metrics::histogram!("finalizer_dispatch_duration_seconds").record(start.elapsed().as_secs_f64());
}
