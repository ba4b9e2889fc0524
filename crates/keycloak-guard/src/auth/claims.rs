//! Decoded token claims.
//!
//! Keycloak tokens carry many provider-defined claims, so the claim set is
//! kept as a JSON object rather than a fixed struct. Integers keep their
//! exact textual value (serde_json `arbitrary_precision`), so identifiers
//! wider than 64 bits survive a decode/serialize cycle unchanged.
//!
//! The `sub` claim is redacted in Debug output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Claim set of a bearer token.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Wrap an already-decoded JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Raw access to any claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Issuer (`iss`).
    pub fn issuer(&self) -> Option<&str> {
        self.get("iss").and_then(Value::as_str)
    }

    /// Subject (`sub`).
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// Expiration timestamp (`exp`, Unix epoch seconds).
    pub fn expires_at(&self) -> Option<i64> {
        self.get("exp").and_then(Value::as_i64)
    }

    /// Issued-at timestamp (`iat`, Unix epoch seconds).
    pub fn issued_at(&self) -> Option<i64> {
        self.get("iat").and_then(Value::as_i64)
    }

    /// Keycloak's `preferred_username`.
    pub fn preferred_username(&self) -> Option<&str> {
        self.get("preferred_username").and_then(Value::as_str)
    }

    /// The `resource_access` mapping of resource name to `{roles: [...]}`.
    pub fn resource_access(&self) -> Option<&Map<String, Value>> {
        self.get("resource_access").and_then(Value::as_object)
    }

    /// The full claim object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Serialize the claim set back to compact JSON.
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(&self.0).ok()
    }
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.issuer())
            .field("exp", &self.expires_at())
            .field("iat", &self.issued_at())
            .field("claim_count", &self.0.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Claims {
        let value = json!({
            "iss": "https://sso.example.com/realms/acme",
            "sub": "secret-user-id",
            "exp": 1_900_000_000,
            "iat": 1_899_999_000,
            "preferred_username": "alice",
            "resource_access": {"orders-api": {"roles": ["admin"]}}
        });
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let debug_str = format!("{:?}", sample());

        assert!(
            !debug_str.contains("secret-user-id"),
            "Debug output should not contain actual sub value"
        );
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("sso.example.com"));
    }

    #[test]
    fn test_standard_accessors() {
        let claims = sample();

        assert_eq!(claims.issuer(), Some("https://sso.example.com/realms/acme"));
        assert_eq!(claims.subject(), Some("secret-user-id"));
        assert_eq!(claims.expires_at(), Some(1_900_000_000));
        assert_eq!(claims.issued_at(), Some(1_899_999_000));
        assert_eq!(claims.preferred_username(), Some("alice"));
        assert!(claims.resource_access().unwrap().contains_key("orders-api"));
    }

    #[test]
    fn test_accessors_tolerate_wrong_types() {
        let claims: Claims = serde_json::from_value(json!({
            "sub": 42,
            "exp": "tomorrow",
            "resource_access": ["not", "an", "object"]
        }))
        .unwrap();

        assert!(claims.subject().is_none());
        assert!(claims.expires_at().is_none());
        assert!(claims.resource_access().is_none());
    }

    #[test]
    fn test_large_integers_keep_exact_digits() {
        let claims: Claims =
            serde_json::from_str(r#"{"sub":"u","account":123456789012345678901234567890}"#)
                .unwrap();

        assert_eq!(
            claims.get("account").unwrap().to_string(),
            "123456789012345678901234567890"
        );
        assert!(claims
            .to_json()
            .unwrap()
            .contains("123456789012345678901234567890"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let claims = sample();
        let json = claims.to_json().unwrap();

        assert!(json.starts_with('{'));
        let back: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claims);
    }
}
