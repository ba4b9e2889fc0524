//! Local token verification against the realm signing key.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Only asymmetric algorithms are accepted; `HS*` and `none` are rejected
//! - Expiration and issuer are always validated
//! - Issued-at is validated with the configured clock skew tolerance

use crate::auth::claims::Claims;
use crate::auth::discovery::SigningKey;
use crate::auth::token::{self, validate_iat_at};
use crate::errors::TokenError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::time::Duration;

/// Verifies token signatures and standard claims.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    /// Tolerance applied to `exp` and to the future-`iat` check.
    leeway: Duration,
}

impl TokenVerifier {
    /// Create a verifier with the given clock leeway.
    pub fn new(leeway: Duration) -> Self {
        Self { leeway }
    }

    /// Verify a token and return its claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size and segment check
    /// 2. Algorithm must be asymmetric and match the key type
    /// 3. Signature against `key`
    /// 4. `exp` not past (with leeway)
    /// 5. `iss` equals `expected_issuer`
    /// 6. `iat` not in the future beyond leeway
    ///
    /// # Errors
    ///
    /// `TokenError::Malformed` for structural problems, `TokenError::Invalid`
    /// for every failed check.
    pub fn verify(
        &self,
        token: &str,
        key: &SigningKey,
        expected_issuer: &str,
    ) -> Result<Claims, TokenError> {
        token::check_size(token)?;
        let header = token::decode_header(token)?;
        let decoding_key = decoding_key_for(header.alg, key)?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_issuer(&[expected_issuer]);

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "keycloak_guard.verifier", error = %e, "Token verification failed");
            map_jwt_error(&e)
        })?;

        validate_iat_at(
            token_data.claims.issued_at(),
            self.leeway,
            chrono::Utc::now().timestamp(),
        )?;

        tracing::debug!(target: "keycloak_guard.verifier", "Token verified");
        Ok(token_data.claims)
    }
}

/// Build the decoding key matching the token's algorithm.
fn decoding_key_for(alg: Algorithm, key: &SigningKey) -> Result<DecodingKey, TokenError> {
    let pem = key.to_pem();
    let result = match alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem.as_bytes()),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem.as_bytes()),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem.as_bytes()),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            tracing::warn!(target: "keycloak_guard.verifier", alg = ?alg, "Symmetric algorithm rejected");
            return Err(TokenError::Invalid(format!(
                "algorithm {:?} is not allowed",
                alg
            )));
        }
    };

    result.map_err(|e| {
        tracing::warn!(target: "keycloak_guard.verifier", alg = ?alg, error = %e, "Signing key does not fit token algorithm");
        TokenError::Invalid(format!("signing key unusable for {:?}: {}", alg, e))
    })
}

fn map_jwt_error(error: &jsonwebtoken::errors::Error) -> TokenError {
    match error.kind() {
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::Malformed(error.to_string())
        }
        ErrorKind::ExpiredSignature => TokenError::Invalid("token has expired".to_string()),
        ErrorKind::InvalidIssuer => TokenError::Invalid("issuer mismatch".to_string()),
        ErrorKind::InvalidSignature => TokenError::Invalid("signature mismatch".to_string()),
        _ => TokenError::Invalid(error.to_string()),
    }
}
