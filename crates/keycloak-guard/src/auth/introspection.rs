//! RFC 7662 token introspection.
//!
//! Asks the provider whether a token is currently active. A response body
//! carrying an `error` field is a negative answer, not a failure; only
//! transport problems and non-JSON bodies are errors.

use crate::errors::GuardError;
use crate::observability::metrics::record_introspection;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Instant;
use tracing::instrument;

/// Provider's answer for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntrospectionOutcome {
    /// The provider vouches for the token.
    Active,

    /// The token is expired, revoked or unknown.
    Inactive,

    /// The provider answered with an `error` field.
    Error(String),
}

impl IntrospectionOutcome {
    pub fn is_active(&self) -> bool {
        matches!(self, IntrospectionOutcome::Active)
    }

    fn metric_label(&self) -> &'static str {
        match self {
            IntrospectionOutcome::Active => "active",
            IntrospectionOutcome::Inactive => "inactive",
            IntrospectionOutcome::Error(_) => "provider_error",
        }
    }
}

/// Client for the provider's introspection endpoint.
pub struct Introspector {
    http_client: reqwest::Client,
}

impl Introspector {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Introspect `token` at `endpoint` using the client credentials.
    ///
    /// The token is forwarded verbatim, including an empty string.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Introspection` if the endpoint is unreachable or
    /// answers with something other than a JSON object.
    #[instrument(skip_all)]
    pub async fn introspect(
        &self,
        token: &str,
        endpoint: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<IntrospectionOutcome, GuardError> {
        let start = Instant::now();
        let result = self
            .call(token, endpoint, client_id, client_secret)
            .await;

        let label = match &result {
            Ok(outcome) => outcome.metric_label(),
            Err(_) => "error",
        };
        record_introspection(label, start.elapsed());

        result
    }

    async fn call(
        &self,
        token: &str,
        endpoint: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<IntrospectionOutcome, GuardError> {
        tracing::debug!(
            target: "keycloak_guard.introspection",
            client_id = %client_id,
            endpoint = %endpoint,
            "Introspecting token"
        );

        let form_body = [
            ("token", token),
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
        ];

        let response = self
            .http_client
            .post(endpoint)
            .form(&form_body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "keycloak_guard.introspection", error = %e, "Introspection request failed");
                GuardError::Introspection(e.to_string())
            })?;

        // Keycloak reports client errors with a JSON body and a 4xx status;
        // the body decides the outcome either way.
        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "keycloak_guard.introspection", error = %e, "Failed to read introspection response");
            GuardError::Introspection(e.to_string())
        })?;

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(
                target: "keycloak_guard.introspection",
                status = %status,
                error = %e,
                "Introspection response is not JSON"
            );
            GuardError::Introspection(format!("status {}: {}", status, e))
        })?;

        let Value::Object(fields) = value else {
            return Err(GuardError::Introspection(format!(
                "status {}: response is not a JSON object",
                status
            )));
        };

        let outcome = match fields.get("error") {
            Some(error) if !error.is_null() => {
                let mut cause = match error {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if let Some(description) = fields.get("error_description").and_then(Value::as_str)
                {
                    cause = format!("{}: {}", cause, description);
                }
                tracing::warn!(
                    target: "keycloak_guard.introspection",
                    status = %status,
                    cause = %cause,
                    "Provider rejected introspection request"
                );
                IntrospectionOutcome::Error(cause)
            }
            _ => {
                if fields.get("active").is_some_and(is_active_flag) {
                    IntrospectionOutcome::Active
                } else {
                    IntrospectionOutcome::Inactive
                }
            }
        };

        tracing::debug!(target: "keycloak_guard.introspection", outcome = ?outcome, "Introspection complete");
        Ok(outcome)
    }
}

/// Read the `active` member.
///
/// Besides a JSON boolean, the string `"true"` and the number `1` count as
/// active, matching providers that serialize the flag loosely.
fn is_active_flag(value: &Value) -> bool {
    match value {
        Value::Bool(active) => *active,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_u64() == Some(1),
        _ => false,
    }
}
