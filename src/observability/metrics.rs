//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): responses by status code
//! - `dispatch_request_duration_seconds` (histogram): time to produce a response
//! - `build_cache_events_total` (counter): build cache `hit`, `build`, `join`, `failure`
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter serves its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(status: u16, start: Instant) {
    metrics::counter!("dispatch_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("dispatch_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a build cache event.
pub fn record_cache_event(event: &'static str) {
    metrics::counter!("build_cache_events_total", "event" => event).increment(1);
}
