//! Guard Service Library
//!
//! A small HTTP service whose protected routes sit behind the Keycloak guard.
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `handlers` - HTTP request handlers
//! - `observability` - Prometheus recorder setup
//! - `routes` - Axum router setup

pub mod config;
pub mod handlers;
pub mod observability;
pub mod routes;
