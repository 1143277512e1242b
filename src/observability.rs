use std::net::SocketAddr;

// ── Write path ───────────────────────────────────────────────────

/// Counter: write validations. Labels: outcome.
pub const VALIDATIONS_TOTAL: &str = "dayplan_validations_total";

/// Counter: user decisions on override prompts. Labels: reason, decision.
pub const OVERRIDES_TOTAL: &str = "dayplan_overrides_total";

/// Counter: writes handed to the store. Labels: op.
pub const WRITES_TOTAL: &str = "dayplan_writes_total";

// ── Read path ────────────────────────────────────────────────────

/// Counter: day layouts computed (on demand or by a live view).
pub const LAYOUT_PASSES_TOTAL: &str = "dayplan_layout_passes_total";

/// Histogram: layout computation time in seconds.
pub const LAYOUT_DURATION_SECONDS: &str = "dayplan_layout_duration_seconds";

/// Histogram: items placed per layout pass.
pub const LAYOUT_ITEMS: &str = "dayplan_layout_items";

/// Gauge: live day views currently running.
pub const LIVE_VIEWS_ACTIVE: &str = "dayplan_live_views_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Time one layout pass and record its size.
pub fn record_layout_pass(items: usize, started: std::time::Instant) {
    metrics::counter!(LAYOUT_PASSES_TOTAL).increment(1);
    metrics::histogram!(LAYOUT_ITEMS).record(items as f64);
    metrics::histogram!(LAYOUT_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}
