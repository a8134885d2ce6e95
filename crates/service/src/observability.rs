use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, Encoder, Histogram, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static WORKERS_STARTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "api_admin_workers_started_total",
        "Total workers spawned by dispatch"
    )
    .expect("register workers_started_total")
});

pub static WORKERS_SUCCEEDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "api_admin_workers_succeeded_total",
        "Total workers whose backend call succeeded"
    )
    .expect("register workers_succeeded_total")
});

pub static WORKERS_FAILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "api_admin_workers_failed_total",
        "Total workers ending with a failure notification"
    )
    .expect("register workers_failed_total")
});

pub static WORKERS_SUPERSEDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "api_admin_workers_superseded_total",
        "Total in-flight workers cancelled by a newer intent or shutdown"
    )
    .expect("register workers_superseded_total")
});

pub static WORKER_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "api_admin_worker_duration_seconds",
        "Settled worker duration in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("register worker_duration")
});

/// Render the default registry in Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# metrics encode error: {e}");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
