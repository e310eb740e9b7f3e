//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vhost_dispatch_total` (counter): dispatch decisions by outcome, protocol
//! - `vhost_dispatch_duration_seconds` (histogram): time spent deciding and,
//!   for forwarded requests, in the mounted application
//!
//! Outcomes are `forward`, `redirect`, `tls_redirect`, `not_found`, `error`.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one dispatch decision.
pub fn record_dispatch(outcome: &'static str, protocol: &'static str, start: Instant) {
    metrics::counter!("vhost_dispatch_total", "outcome" => outcome, "protocol" => protocol)
        .increment(1);
    metrics::histogram!("vhost_dispatch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}
