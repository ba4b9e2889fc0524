//! Axum middleware.
//!
//! # Components
//!
//! - `auth` - Bearer token extraction and the guard middleware

pub mod auth;

pub use auth::{extract_bearer_token, require_keycloak_auth, require_role, PrincipalExt};
