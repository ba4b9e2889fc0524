//! HTTP request handlers for Guard Service.

pub mod admin;
pub mod health;
pub mod me;
pub mod metrics;

pub use admin::get_admin;
pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
