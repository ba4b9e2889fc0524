//! Observability for the guard.
//!
//! Logging goes through `tracing` with `keycloak_guard.*` targets; metrics
//! are defined in [`metrics`].

pub mod metrics;
