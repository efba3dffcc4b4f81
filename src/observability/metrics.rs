//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): total requests by method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `rewrite_responses_total` (counter): rewrite attempts by outcome, encoding
//! - `rewrite_duration_seconds` (histogram): decode + substitute + encode time
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op
//! - Prometheus exporter only when a metrics address is configured

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::rewrite::codec::ContentEncoding;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a proxied request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a successful rewrite.
pub fn record_rewrite(encoding: ContentEncoding, start: Instant) {
    metrics::counter!(
        "rewrite_responses_total",
        "outcome" => "rewritten",
        "encoding" => encoding.label()
    )
    .increment(1);
    metrics::histogram!("rewrite_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a rewrite that failed and was turned into an error response.
pub fn record_rewrite_failure() {
    metrics::counter!("rewrite_responses_total", "outcome" => "failed").increment(1);
}
