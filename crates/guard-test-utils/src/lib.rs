//! # Guard Test Utilities
//!
//! Shared test utilities for the Keycloak guard crates.
//!
//! This crate provides:
//! - Key fixtures (`crypto_fixtures`): RSA and Ed25519 PEM keys
//! - Signed token construction (`TestTokenBuilder`)
//! - A mock Keycloak realm on wiremock (`MockKeycloak`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guard_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keycloak = MockKeycloak::start("acme").await;
//!     keycloak.mount_introspection(serde_json::json!({"active": true})).await;
//!
//!     let token = TestTokenBuilder::new()
//!         .issuer(&keycloak.issuer())
//!         .client_role("orders-api", "admin")
//!         .sign_rs256();
//!     // ...
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_keycloak;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use mock_keycloak::*;
pub use token_builders::*;
