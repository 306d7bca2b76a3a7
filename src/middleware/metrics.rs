//! Prometheus metrics for the highscore API.
//!
//! Exposes a standard `/metrics` endpoint that Prometheus can scrape.
//! The executor records every statement; the verifier records every
//! permission decision.

use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{
    opts, register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec,
    TextEncoder,
};

use crate::auth::registry::Permission;

/// Registered once in the global default registry on first use.
static RECORDER: Lazy<PrometheusRecorder> = Lazy::new(PrometheusRecorder::new);

pub struct PrometheusRecorder {
    queries_total: CounterVec,
    query_duration_seconds: HistogramVec,
    permission_checks_total: CounterVec,
}

impl PrometheusRecorder {
    fn new() -> Self {
        let queries_total = register_counter_vec!(
            opts!("hiscore_queries_total", "Total statements executed"),
            &["kind", "outcome"]
        )
        .expect("failed to register hiscore_queries_total");

        let query_duration_seconds = register_histogram_vec!(
            prometheus::histogram_opts!(
                "hiscore_query_duration_seconds",
                "Statement latency in seconds, including connection checkout",
                vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 30.0]
            ),
            &["kind"]
        )
        .expect("failed to register hiscore_query_duration_seconds");

        let permission_checks_total = register_counter_vec!(
            opts!("hiscore_permission_checks_total", "Token permission decisions"),
            &["permission", "outcome"]
        )
        .expect("failed to register hiscore_permission_checks_total");

        Self {
            queries_total,
            query_duration_seconds,
            permission_checks_total,
        }
    }
}

/// Record one executed statement. `kind` is `read`, `write` or `batch`.
pub fn record_query(kind: &str, ok: bool, elapsed: Duration) {
    let outcome = if ok { "ok" } else { "error" };
    RECORDER.queries_total.with_label_values(&[kind, outcome]).inc();
    RECORDER
        .query_duration_seconds
        .with_label_values(&[kind])
        .observe(elapsed.as_secs_f64());
}

/// Record one permission decision. Names outside the registry are bucketed
/// to `unknown` to bound label cardinality.
pub fn record_permission_check(permission: Option<Permission>, granted: bool) {
    let label = permission.map(Permission::name).unwrap_or("unknown");
    let outcome = if granted { "granted" } else { "denied" };
    RECORDER
        .permission_checks_total
        .with_label_values(&[label, outcome])
        .inc();
}

/// Encode all registered metrics as Prometheus text format.
/// Called by the `/metrics` HTTP handler.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_returns_valid_text() {
        let output = encode_metrics();
        assert!(output.is_ascii() || output.is_empty());
    }

    #[test]
    fn test_recorded_query_is_exported() {
        record_query("read", true, Duration::from_millis(3));
        let output = encode_metrics();
        assert!(output.contains("hiscore_queries_total"));
        assert!(output.contains("hiscore_query_duration_seconds"));
    }

    #[test]
    fn test_unknown_permission_bucketed() {
        record_permission_check(None, false);
        let output = encode_metrics();
        assert!(output.contains(r#"permission="unknown""#));
    }
}
