//! Keycloak Guard error types.
//!
//! A negative authentication result (missing or inactive token) is NOT an
//! error: it is reported through [`crate::guard::AuthState::Rejected`]. The
//! types here cover the fatal categories only: provider discovery, the
//! introspection transport, and tokens that fail decoding or verification.
//!
//! Messages returned to clients via `IntoResponse` are generic. The
//! underlying cause is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while decoding or verifying a bearer token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong number of segments, bad base64, or a payload that is not a JSON object.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Signature, expiry, issuer or algorithm check failed.
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Keycloak Guard error type.
///
/// Maps to HTTP status codes:
/// - InvalidDiscovery, Introspection: 503 Service Unavailable
/// - Token, Unauthenticated: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - UserResolution, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GuardError {
    /// Discovery document or realm key could not be fetched or parsed.
    #[error("[Keycloak Guard] {0}")]
    InvalidDiscovery(String),

    /// The introspection endpoint could not be reached or answered garbage.
    #[error("[Keycloak Guard] Introspection failed: {0}")]
    Introspection(String),

    /// Token decode or verification failed.
    #[error("[Keycloak Guard] {0}")]
    Token(#[from] TokenError),

    /// The request carried no usable credentials.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Authenticated, but lacking a required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The user resolver could not materialize a local identity.
    #[error("User resolution failed: {0}")]
    UserResolution(String),

    /// Local setup fault, such as an HTTP client that cannot be built.
    #[error("[Keycloak Guard] Internal error: {0}")]
    Internal(String),
}

impl GuardError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GuardError::InvalidDiscovery(_) | GuardError::Introspection(_) => 503,
            GuardError::Token(_) | GuardError::Unauthenticated => 401,
            GuardError::Forbidden(_) => 403,
            GuardError::UserResolution(_) | GuardError::Internal(_) => 500,
        }
    }

    /// Bounded label used for the `outcome` metric dimension.
    pub fn metric_label(&self) -> &'static str {
        match self {
            GuardError::InvalidDiscovery(_) => "discovery_error",
            GuardError::Introspection(_) => "introspection_error",
            GuardError::Token(TokenError::Malformed(_)) => "malformed_token",
            GuardError::Token(TokenError::Invalid(_)) => "invalid_token",
            GuardError::Unauthenticated => "unauthenticated",
            GuardError::Forbidden(_) => "forbidden",
            GuardError::UserResolution(_) => "user_resolution_error",
            GuardError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GuardError::InvalidDiscovery(cause) => {
                tracing::error!(target: "keycloak_guard.errors", cause = %cause, "Provider discovery failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Authentication service unavailable".to_string(),
                )
            }
            GuardError::Introspection(cause) => {
                tracing::error!(target: "keycloak_guard.errors", cause = %cause, "Token introspection failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Authentication service unavailable".to_string(),
                )
            }
            GuardError::Token(err) => {
                tracing::debug!(target: "keycloak_guard.errors", error = %err, "Token rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "The access token is invalid or expired".to_string(),
                )
            }
            GuardError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Authentication required".to_string(),
            ),
            GuardError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            GuardError::UserResolution(cause) => {
                tracing::error!(target: "keycloak_guard.errors", cause = %cause, "User resolution failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            GuardError::Internal(cause) => {
                tracing::error!(target: "keycloak_guard.errors", cause = %cause, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = match self {
                GuardError::Token(_) => "Bearer realm=\"keycloak-guard\", error=\"invalid_token\"",
                _ => "Bearer realm=\"keycloak-guard\"",
            };
            if let Ok(header_value) = challenge.parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
