//! Prometheus metrics endpoint
//!
//! Exposes decision and cache metrics in Prometheus format.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

use crate::engine::types::RewardType;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;
    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "reward_decisions_total",
        "Reward decisions computed, by reward type"
    );
    metrics::describe_counter!(
        "reward_idempotent_replays_total",
        "Requests answered from a stored decision"
    );
    metrics::describe_counter!(
        "reward_cache_operations_total",
        "Cache operations by operation and result"
    );
    metrics::describe_counter!(
        "reward_deferred_write_failures_total",
        "Background cache writes that failed"
    );
    metrics::describe_histogram!(
        "reward_decision_duration_seconds",
        "Time to compute a new decision"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a computed decision
pub fn record_decision(reward_type: RewardType, duration_secs: f64) {
    metrics::counter!("reward_decisions_total", "reward_type" => reward_type.as_str())
        .increment(1);
    metrics::histogram!("reward_decision_duration_seconds").record(duration_secs);
}

/// Record a replayed decision
pub fn record_idempotent_replay() {
    metrics::counter!("reward_idempotent_replays_total").increment(1);
}

/// Record cache operation
pub fn record_cache_operation(operation: &str, result: &str) {
    metrics::counter!(
        "reward_cache_operations_total",
        "operation" => operation.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record a failed background write
pub fn record_deferred_write_failure() {
    metrics::counter!("reward_deferred_write_failures_total").increment(1);
}
