use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total requests handled. Labels: endpoint, status.
pub const REQUESTS_TOTAL: &str = "courierd_requests_total";

/// Histogram: request latency in seconds. Labels: endpoint.
pub const REQUEST_DURATION_SECONDS: &str = "courierd_request_duration_seconds";

// ── Domain counters ─────────────────────────────────────────────

/// Counter: orders stamped in_progress by assign.
pub const ORDERS_ASSIGNED_TOTAL: &str = "courierd_orders_assigned_total";

/// Counter: orders transitioned to completed.
pub const ORDERS_COMPLETED_TOTAL: &str = "courierd_orders_completed_total";

/// Counter: in-progress orders released by courier patches.
pub const ORDERS_RELEASED_TOTAL: &str = "courierd_orders_released_total";

/// Counter: assignment batches fully drained (courier back to zero
/// in-progress orders).
pub const BATCHES_COMPLETED_TOTAL: &str = "courierd_batches_completed_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
