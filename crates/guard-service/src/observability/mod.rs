//! Observability for Guard Service.

pub mod metrics;

pub use metrics::init_metrics_recorder;
