//! Prometheus recorder for the guard's metrics.
//!
//! The guard library only emits through the `metrics` facade; this module
//! installs the process-wide recorder that `/metrics` renders.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded. Histogram buckets:
/// - Authentication and introspection: 1ms to 2.5s
/// - Discovery fetches: 10ms to 10s
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("keycloak_guard_authentication_duration_seconds".to_string()),
            &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500],
        )
        .map_err(|e| format!("Failed to set authentication buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full("keycloak_guard_introspection_duration_seconds".to_string()),
            &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500],
        )
        .map_err(|e| format!("Failed to set introspection buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full("keycloak_guard_discovery_duration_seconds".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set discovery buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}
