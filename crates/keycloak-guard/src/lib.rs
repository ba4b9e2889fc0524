//! Keycloak Guard Library
//!
//! Stateless bearer-token authentication against a Keycloak realm:
//!
//! - Discovery document and realm public key, cached in an injected store
//! - Remote token introspection or local signature verification
//! - Unverified claim decoding for introspected tokens
//! - `resource_access` role checks
//! - Axum middleware that puts the resolved principal on the request
//!
//! # Architecture
//!
//! ```text
//! middleware/auth.rs -> guard.rs -> auth/{discovery,introspection,verifier,token}.rs
//!                                      \-> store.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Discovery cache, token codec, verifier, introspector, role checks
//! - `config` - Guard configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `guard` - The per-request authentication decision
//! - `middleware` - Axum middleware
//! - `observability` - Metrics
//! - `store` - Metadata store collaborator

pub mod auth;
pub mod config;
pub mod errors;
pub mod guard;
pub mod middleware;
pub mod observability;
pub mod store;

pub use config::GuardConfig;
pub use errors::{GuardError, TokenError};
pub use guard::{
    AuthState, Identity, KeycloakGuard, LocalUser, Principal, Rejection, RequestAuth,
    SubjectUserResolver, UserResolver,
};
pub use store::{InMemoryStore, MetadataStore};
