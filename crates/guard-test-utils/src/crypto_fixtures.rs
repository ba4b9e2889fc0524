//! Static key fixtures for signing and verifying test tokens.
//!
//! The PEM files under `fixtures/` were generated once with openssl and are
//! checked in so tests are reproducible and need no key generation crate.

/// Realm RSA private key (PKCS#1).
pub const RSA_PRIVATE_KEY_PEM: &str = include_str!("fixtures/rsa_private.pem");

/// Public half of [`RSA_PRIVATE_KEY_PEM`] (SubjectPublicKeyInfo).
pub const RSA_PUBLIC_KEY_PEM: &str = include_str!("fixtures/rsa_public.pem");

/// An unrelated RSA private key, for tokens the realm never issued.
pub const ROGUE_RSA_PRIVATE_KEY_PEM: &str = include_str!("fixtures/rogue_rsa_private.pem");

/// Ed25519 private key (PKCS#8).
pub const ED25519_PRIVATE_KEY_PEM: &str = include_str!("fixtures/ed25519_private.pem");

/// Public half of [`ED25519_PRIVATE_KEY_PEM`].
pub const ED25519_PUBLIC_KEY_PEM: &str = include_str!("fixtures/ed25519_public.pem");

/// Convert a PEM public key into the bare base64 form Keycloak publishes as
/// `public_key` in the realm document.
pub fn keycloak_public_key(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----"))
        .map(str::trim)
        .collect()
}

/// The realm RSA public key as Keycloak publishes it.
pub fn realm_public_key() -> String {
    keycloak_public_key(RSA_PUBLIC_KEY_PEM)
}
