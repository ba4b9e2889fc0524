//! Compact token decoding.
//!
//! Splits a bearer token into its three segments and decodes the header and
//! payload WITHOUT verifying the signature. Callers that need an authenticity
//! decision must either verify the token with
//! [`TokenVerifier`](crate::auth::verifier::TokenVerifier) or have the
//! provider vouch for it through introspection.
//!
//! Decoding places no limit on token size. Introspected tokens are vouched
//! for by the provider however large they are; the size bound in
//! [`MAX_TOKEN_SIZE_BYTES`] applies to local verification only.
//!
//! The payload must decode to a JSON object.

use crate::auth::claims::Claims;
use crate::errors::TokenError;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use jsonwebtoken::Header;
use serde_json::Value;
use std::time::Duration;

/// Maximum token size accepted for local verification (64KB).
///
/// Keycloak tokens carrying hundreds of groups stay well below this; larger
/// input is rejected before any signature work is done.
pub const MAX_TOKEN_SIZE_BYTES: usize = 64 * 1024;

/// Maximum clock skew tolerance accepted from configuration (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// base64url engine that accepts segments with or without `=` padding.
///
/// [`decode_segment`] maps the standard alphabet's `+` and `/` onto `-` and
/// `_` first, so segments produced by a plain base64 encoder decode too.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Reject tokens larger than [`MAX_TOKEN_SIZE_BYTES`].
pub(crate) fn check_size(token: &str) -> Result<(), TokenError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "keycloak_guard.token",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(TokenError::Malformed(format!(
            "token exceeds {} bytes",
            MAX_TOKEN_SIZE_BYTES
        )));
    }
    Ok(())
}

/// Split a token into `(header, payload, signature)` segments.
pub(crate) fn split_segments(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => {
            let segments = token.split('.').count();
            tracing::debug!(
                target: "keycloak_guard.token",
                segments,
                "Token rejected: expected three segments"
            );
            Err(TokenError::Malformed(format!(
                "expected 3 segments, found {}",
                segments
            )))
        }
    }
}

/// Decode a base64url segment, tolerating absent padding and `+`/`/`.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    let normalized: String = segment
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_LENIENT
        .decode(normalized)
        .map_err(|e| TokenError::Malformed(format!("invalid base64url segment: {}", e)))
}

/// Decode the claims of a token without verifying its signature.
///
/// # Errors
///
/// Returns `TokenError::Malformed` when the token does not have exactly three
/// segments or its payload is not a base64url-encoded JSON object.
pub fn decode(token: &str) -> Result<Claims, TokenError> {
    let (_, payload, _) = split_segments(token)?;
    let payload_bytes = decode_segment(payload)?;

    let value: Value = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "keycloak_guard.token", error = %e, "Failed to parse token payload JSON");
        TokenError::Malformed(format!("payload is not valid JSON: {}", e))
    })?;

    match value {
        Value::Object(map) => Ok(Claims::from_map(map)),
        _ => Err(TokenError::Malformed(
            "payload is not a JSON object".to_string(),
        )),
    }
}

/// Decode the JOSE header (`alg`, `kid`, ...) of a token.
pub fn decode_header(token: &str) -> Result<Header, TokenError> {
    split_segments(token)?;
    jsonwebtoken::decode_header(token).map_err(|e| {
        tracing::debug!(target: "keycloak_guard.token", error = %e, "Failed to parse token header");
        TokenError::Malformed(format!("invalid header: {}", e))
    })
}

/// Validate the `iat` claim against `now` with clock skew tolerance.
///
/// Tokens issued more than `clock_skew` in the future are rejected. A missing
/// `iat` is accepted; Keycloak always sets it, other issuers may not.
pub(crate) fn validate_iat_at(
    iat: Option<i64>,
    clock_skew: Duration,
    now: i64,
) -> Result<(), TokenError> {
    let Some(iat) = iat else {
        return Ok(());
    };

    let clock_skew_secs = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "keycloak_guard.token",
            iat,
            now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(TokenError::Invalid(
            "token issued in the future".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
    use serde_json::json;

    fn token_with_payload(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT","kid":"k1"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload);
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_decode_returns_encoded_claims() {
        let payload = json!({
            "iss": "https://sso.example.com/realms/acme",
            "sub": "f3a1",
            "exp": 1_900_000_000,
            "resource_access": {"orders-api": {"roles": ["admin", "reader"]}}
        });
        let token = token_with_payload(&payload.to_string());

        let claims = decode(&token).unwrap();

        assert_eq!(claims.issuer(), Some("https://sso.example.com/realms/acme"));
        assert_eq!(claims.subject(), Some("f3a1"));
        assert_eq!(claims.expires_at(), Some(1_900_000_000));
        assert_eq!(
            claims.get("resource_access").unwrap(),
            &payload["resource_access"]
        );
    }

    #[test]
    fn test_decode_accepts_padded_payload() {
        // "{"a":1}" is 7 bytes, so padded base64 ends in '='
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let body = URL_SAFE.encode(r#"{"a":1}"#);
        assert!(body.ends_with('='));
        let token = format!("{header}.{body}.");

        let claims = decode(&token).unwrap();
        assert_eq!(claims.get("a").unwrap(), &json!(1));
    }

    #[test]
    fn test_decode_uses_url_safe_alphabet() {
        // Payload bytes chosen so the encoding contains '-' and '_'
        let payload = r#"{"k":"~~~???>>>"}"#;
        let body = URL_SAFE_NO_PAD.encode(payload);
        assert!(body.contains('-') || body.contains('_'));
        let token = format!("e30.{body}.sig");

        let claims = decode(&token).unwrap();
        assert_eq!(claims.get("k").unwrap(), "~~~???>>>");
    }

    #[test]
    fn test_decode_preserves_big_integers() {
        let token = token_with_payload(r#"{"sub":"u","tenant":98765432109876543210987}"#);

        let claims = decode(&token).unwrap();
        assert_eq!(
            claims.get("tenant").unwrap().to_string(),
            "98765432109876543210987"
        );
    }

    #[test]
    fn test_decode_rejects_wrong_segment_counts() {
        for token in ["", "single", "only.two", "a.b.c.d", "not.a.valid.jwt.format"] {
            let result = decode(token);
            assert!(
                matches!(result, Err(TokenError::Malformed(_))),
                "{token:?} should be malformed, got {result:?}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let result = decode("e30.!!!invalid!!!.sig");
        assert!(matches!(result, Err(TokenError::Malformed(msg)) if msg.contains("base64")));
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let token = token_with_payload("not json at all");
        let result = decode(&token);
        assert!(matches!(result, Err(TokenError::Malformed(msg)) if msg.contains("JSON")));
    }

    #[test]
    fn test_decode_rejects_non_object_payload() {
        let token = token_with_payload("[1,2,3]");
        let result = decode(&token);
        assert!(matches!(result, Err(TokenError::Malformed(msg)) if msg.contains("object")));
    }

    #[test]
    fn test_decode_accepts_standard_alphabet_payload() {
        // Same bytes as the url-safe test, encoded with '+' and '/'
        let payload = r#"{"k":"~~~???>>>"}"#;
        let body = base64::engine::general_purpose::STANDARD_NO_PAD.encode(payload);
        assert!(body.contains('+') || body.contains('/'));
        let token = format!("e30.{body}.sig");

        let claims = decode(&token).unwrap();
        assert_eq!(claims.get("k").unwrap(), "~~~???>>>");
    }

    #[test]
    fn test_decode_has_no_size_limit() {
        let groups: Vec<String> = (0..400).map(|i| format!("/organisation/engineering/team-{i:04}")).collect();
        let payload = json!({"sub": "u-1", "groups": groups});
        let token = token_with_payload(&payload.to_string());
        assert!(token.len() > 12 * 1024);

        let claims = decode(&token).unwrap();
        assert_eq!(claims.get("groups").unwrap().as_array().unwrap().len(), 400);
    }

    #[test]
    fn test_check_size_bounds() {
        assert!(check_size(&"a".repeat(MAX_TOKEN_SIZE_BYTES)).is_ok());

        let result = check_size(&"a".repeat(MAX_TOKEN_SIZE_BYTES + 1));
        assert!(matches!(result, Err(TokenError::Malformed(msg)) if msg.contains("exceeds")));
    }

    #[test]
    fn test_decode_header_reads_alg_and_kid() {
        let token = token_with_payload("{}");
        let header = decode_header(&token).unwrap();

        assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("k1"));
    }

    #[test]
    fn test_decode_header_rejects_garbage_header() {
        let body = URL_SAFE_NO_PAD.encode("{}");
        let token = format!("bm90LWpzb24.{body}.sig");
        assert!(matches!(decode_header(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_validate_iat_boundaries() {
        let now = 1_700_000_000_i64;
        let skew = Duration::from_secs(300);

        assert!(validate_iat_at(Some(now - 3600), skew, now).is_ok());
        assert!(validate_iat_at(Some(now + 300), skew, now).is_ok());
        assert!(matches!(
            validate_iat_at(Some(now + 301), skew, now),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_iat_missing_is_accepted() {
        assert!(validate_iat_at(None, Duration::ZERO, 1_700_000_000).is_ok());
    }
}
