//! Builder patterns for test tokens
//!
//! Produces Keycloak-shaped access tokens signed with the fixture keys.

use crate::crypto_fixtures::{ED25519_PRIVATE_KEY_PEM, RSA_PRIVATE_KEY_PEM};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Default issuer used when none is set.
pub const DEFAULT_ISSUER: &str = "https://sso.example.com/realms/acme";

/// Builder for Keycloak-style access tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .issuer("https://sso.example.com/realms/acme")
///     .subject("alice-id")
///     .client_role("orders-api", "admin")
///     .expires_in(300)
///     .sign_rs256();
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".into(), json!(DEFAULT_ISSUER));
        claims.insert("sub".into(), json!("test-subject"));
        claims.insert("typ".into(), json!("Bearer"));
        claims.insert("exp".into(), json!((now + Duration::seconds(3600)).timestamp()));
        claims.insert("iat".into(), json!(now.timestamp()));
        Self { claims }
    }

    /// Set the issuer
    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    /// Set the subject
    pub fn subject(self, subject: &str) -> Self {
        self.claim("sub", json!(subject))
    }

    /// Remove the subject, as Keycloak's lightweight tokens do
    pub fn without_subject(mut self) -> Self {
        self.claims.remove("sub");
        self
    }

    /// Set `preferred_username`
    pub fn preferred_username(self, username: &str) -> Self {
        self.claim("preferred_username", json!(username))
    }

    /// Set expiration in seconds from now (negative for expired tokens)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.claim("exp", json!(exp))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.claim("iat", json!(timestamp))
    }

    /// Grant a client role under `resource_access.<resource>.roles`
    pub fn client_role(mut self, resource: &str, role: &str) -> Self {
        let access = self
            .claims
            .entry("resource_access")
            .or_insert_with(|| json!({}));
        let entry = access
            .as_object_mut()
            .expect("resource_access is an object")
            .entry(resource.to_string())
            .or_insert_with(|| json!({"roles": []}));
        entry["roles"]
            .as_array_mut()
            .expect("roles is an array")
            .push(json!(role));
        self
    }

    /// Set any claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// The claims as a JSON value
    pub fn build(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with the realm RSA key (RS256)
    pub fn sign_rs256(self) -> String {
        self.sign_rs256_with(RSA_PRIVATE_KEY_PEM)
    }

    /// Sign with another RSA private key (RS256)
    pub fn sign_rs256_with(self, private_key_pem: &str) -> String {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .expect("fixture RSA key is valid");
        self.sign(Algorithm::RS256, &key)
    }

    /// Sign with the realm RSA key using RSASSA-PSS (PS256)
    pub fn sign_ps256(self) -> String {
        let key = EncodingKey::from_rsa_pem(RSA_PRIVATE_KEY_PEM.as_bytes())
            .expect("fixture RSA key is valid");
        self.sign(Algorithm::PS256, &key)
    }

    /// Sign with the Ed25519 fixture key (EdDSA)
    pub fn sign_ed25519(self) -> String {
        let key = EncodingKey::from_ed_pem(ED25519_PRIVATE_KEY_PEM.as_bytes())
            .expect("fixture Ed25519 key is valid");
        self.sign(Algorithm::EdDSA, &key)
    }

    /// Sign with a shared secret (HS256)
    pub fn sign_hs256(self, secret: &[u8]) -> String {
        self.sign(Algorithm::HS256, &EncodingKey::from_secret(secret))
    }

    /// Encode with `alg: none` and an empty signature
    pub fn unsigned(self) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(self.build().to_string());
        format!("{header}.{payload}.")
    }

    fn sign(self, alg: Algorithm, key: &EncodingKey) -> String {
        let mut header = Header::new(alg);
        header.kid = Some("realm-key-1".to_string());
        encode(&header, &Value::Object(self.claims), key).expect("token encodes")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Alter the first character of the signature segment, keeping it valid base64url.
pub fn tamper_signature(token: &str) -> String {
    let (signed_part, signature) = token.rsplit_once('.').expect("token has a signature segment");
    let mut chars = signature.chars();
    let first = chars.next().expect("signature is not empty");
    let replacement = if first == 'A' { 'B' } else { 'A' };
    format!("{signed_part}.{replacement}{}", chars.as_str())
}

/// Replace the payload segment with `claims`, keeping the original signature.
pub fn swap_payload(token: &str, claims: &Value) -> String {
    let mut parts = token.split('.');
    let header = parts.next().expect("token has a header");
    let _ = parts.next().expect("token has a payload");
    let signature = parts.next().expect("token has a signature");
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.{signature}")
}
