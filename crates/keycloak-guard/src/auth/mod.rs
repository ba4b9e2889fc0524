//! Token handling for the guard.
//!
//! - [`discovery`]: provider metadata and realm key cache
//! - [`token`]: unverified compact token decoding
//! - [`verifier`]: local signature and claim verification
//! - [`introspection`]: remote introspection
//! - [`roles`]: `resource_access` role checks

pub mod claims;
pub mod discovery;
pub mod introspection;
pub mod roles;
pub mod token;
pub mod verifier;

pub use claims::Claims;
pub use discovery::{DiscoveryCache, ProviderMetadata, SigningKey};
pub use introspection::{IntrospectionOutcome, Introspector};
pub use verifier::TokenVerifier;
