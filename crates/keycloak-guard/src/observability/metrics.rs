//! Metrics emitted by the guard.
//!
//! All metrics follow Prometheus naming conventions:
//! - `keycloak_guard_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! Nothing is exported from here; the hosting service installs a recorder.
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `strategy`: `introspection` or `local`
//! - `outcome`: `authenticated`, `rejected`, or a `GuardError::metric_label`
//! - `status`: `success` or `error`
//! - `result`: `hit` or `miss`

use metrics::{counter, histogram};
use std::time::Duration;

/// Record one authentication decision.
///
/// Metric: `keycloak_guard_authentications_total`,
/// `keycloak_guard_authentication_duration_seconds`
pub fn record_authentication(strategy: &'static str, outcome: &'static str, duration: Duration) {
    histogram!("keycloak_guard_authentication_duration_seconds",
        "strategy" => strategy
    )
    .record(duration.as_secs_f64());

    counter!("keycloak_guard_authentications_total",
        "strategy" => strategy,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a metadata store lookup.
///
/// Metric: `keycloak_guard_metadata_cache_total`
pub fn record_metadata_cache(result: &'static str) {
    counter!("keycloak_guard_metadata_cache_total", "result" => result).increment(1);
}

/// Record a discovery fetch (discovery document plus realm key).
///
/// Metric: `keycloak_guard_discovery_fetches_total`,
/// `keycloak_guard_discovery_duration_seconds`
pub fn record_discovery_fetch(status: &'static str, duration: Duration) {
    histogram!("keycloak_guard_discovery_duration_seconds").record(duration.as_secs_f64());

    counter!("keycloak_guard_discovery_fetches_total", "status" => status).increment(1);
}

/// Record an introspection call.
///
/// Metric: `keycloak_guard_introspections_total`,
/// `keycloak_guard_introspection_duration_seconds`
pub fn record_introspection(outcome: &'static str, duration: Duration) {
    histogram!("keycloak_guard_introspection_duration_seconds").record(duration.as_secs_f64());

    counter!("keycloak_guard_introspections_total", "outcome" => outcome).increment(1);
}
