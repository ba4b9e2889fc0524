//! Keycloak Guard configuration.
//!
//! Configuration is loaded from environment variables. The client secret is
//! held in a [`SecretString`] and redacted in Debug output.

use crate::auth::token::MAX_CLOCK_SKEW;
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default outbound HTTP timeout for discovery and introspection calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound accepted for `KEYCLOAK_HTTP_TIMEOUT_SECONDS`.
pub const MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Keycloak Guard configuration.
#[derive(Clone)]
pub struct GuardConfig {
    /// URL of the provider's discovery document (`well-known`).
    pub well_known_url: String,

    /// Client/resource name. Used as the introspection `client_id` and as the
    /// key into the token's `resource_access` claim for role checks.
    pub client_resource: String,

    /// Client secret sent with introspection requests.
    pub client_secret: SecretString,

    /// Use remote introspection (true) or local signature verification (false).
    pub introspect: bool,

    /// Optional prefix for metadata cache keys, one per realm when several
    /// realms share a store.
    pub cache_namespace: Option<String>,

    /// Leeway in seconds applied to `exp` and to the future-`iat` check.
    pub leeway_seconds: u64,

    /// Timeout applied to every outbound HTTP request.
    pub http_timeout: Duration,
}

impl fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardConfig")
            .field("well_known_url", &self.well_known_url)
            .field("client_resource", &self.client_resource)
            .field("client_secret", &"[REDACTED]")
            .field("introspect", &self.introspect)
            .field("cache_namespace", &self.cache_namespace)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid boolean configuration: {0}")]
    InvalidBool(String),

    #[error("Invalid leeway configuration: {0}")]
    InvalidLeeway(String),

    #[error("Invalid HTTP timeout configuration: {0}")]
    InvalidHttpTimeout(String),
}

impl GuardConfig {
    /// Create a configuration with defaults for everything except the
    /// discovery URL and client resource.
    pub fn new(well_known_url: impl Into<String>, client_resource: impl Into<String>) -> Self {
        Self {
            well_known_url: well_known_url.into(),
            client_resource: client_resource.into(),
            client_secret: SecretString::from(""),
            introspect: true,
            cache_namespace: None,
            leeway_seconds: 0,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Set the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = SecretString::from(secret.into());
        self
    }

    /// Choose between introspection and local verification.
    #[must_use]
    pub fn with_introspect(mut self, introspect: bool) -> Self {
        self.introspect = introspect;
        self
    }

    /// Prefix cache keys with a namespace.
    #[must_use]
    pub fn with_cache_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cache_namespace = Some(namespace.into());
        self
    }

    /// Set the clock leeway.
    #[must_use]
    pub fn with_leeway_seconds(mut self, leeway_seconds: u64) -> Self {
        self.leeway_seconds = leeway_seconds;
        self
    }

    /// Set the outbound HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let well_known_url = required(vars, "KEYCLOAK_WELL_KNOWN")?;
        let client_resource = required(vars, "KEYCLOAK_CLIENT_RESOURCE")?;

        let client_secret = SecretString::from(
            vars.get("KEYCLOAK_CLIENT_SECRET")
                .cloned()
                .unwrap_or_default(),
        );

        let introspect = match vars.get("KEYCLOAK_INTROSPECT") {
            Some(value) => parse_bool("KEYCLOAK_INTROSPECT", value)?,
            None => true,
        };

        let cache_namespace = vars
            .get("KEYCLOAK_CACHE_NAMESPACE")
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());

        let leeway_seconds = if let Some(value_str) = vars.get("KEYCLOAK_LEEWAY_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidLeeway(format!(
                    "KEYCLOAK_LEEWAY_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidLeeway(format!(
                    "KEYCLOAK_LEEWAY_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            0
        };

        let http_timeout = if let Some(value_str) = vars.get("KEYCLOAK_HTTP_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidHttpTimeout(format!(
                    "KEYCLOAK_HTTP_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_HTTP_TIMEOUT.as_secs() {
                return Err(ConfigError::InvalidHttpTimeout(format!(
                    "KEYCLOAK_HTTP_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                    MAX_HTTP_TIMEOUT.as_secs(),
                    value
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_HTTP_TIMEOUT
        };

        Ok(GuardConfig {
            well_known_url,
            client_resource,
            client_secret,
            introspect,
            cache_namespace,
            leeway_seconds,
            http_timeout,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidBool(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "KEYCLOAK_WELL_KNOWN".to_string(),
                "https://sso.example.com/realms/acme/.well-known/openid-configuration".to_string(),
            ),
            (
                "KEYCLOAK_CLIENT_RESOURCE".to_string(),
                "orders-api".to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = GuardConfig::from_vars(&base_vars()).expect("Config should load");

        assert_eq!(
            config.well_known_url,
            "https://sso.example.com/realms/acme/.well-known/openid-configuration"
        );
        assert_eq!(config.client_resource, "orders-api");
        assert_eq!(config.client_secret.expose_secret(), "");
        assert!(config.introspect, "introspection is on by default");
        assert!(config.cache_namespace.is_none());
        assert_eq!(config.leeway_seconds, 0);
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("KEYCLOAK_CLIENT_SECRET".to_string(), "s3cr3t".to_string());
        vars.insert("KEYCLOAK_INTROSPECT".to_string(), "false".to_string());
        vars.insert("KEYCLOAK_CACHE_NAMESPACE".to_string(), "acme".to_string());
        vars.insert("KEYCLOAK_LEEWAY_SECONDS".to_string(), "30".to_string());
        vars.insert("KEYCLOAK_HTTP_TIMEOUT_SECONDS".to_string(), "3".to_string());

        let config = GuardConfig::from_vars(&vars).expect("Config should load");

        assert_eq!(config.client_secret.expose_secret(), "s3cr3t");
        assert!(!config.introspect);
        assert_eq!(config.cache_namespace.as_deref(), Some("acme"));
        assert_eq!(config.leeway_seconds, 30);
        assert_eq!(config.http_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_from_vars_missing_well_known() {
        let mut vars = base_vars();
        vars.remove("KEYCLOAK_WELL_KNOWN");

        let result = GuardConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "KEYCLOAK_WELL_KNOWN"));
    }

    #[test]
    fn test_from_vars_blank_client_resource_is_missing() {
        let mut vars = base_vars();
        vars.insert("KEYCLOAK_CLIENT_RESOURCE".to_string(), "   ".to_string());

        let result = GuardConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "KEYCLOAK_CLIENT_RESOURCE")
        );
    }

    #[test]
    fn test_introspect_accepts_common_spellings() {
        for (raw, expected) in [
            ("TRUE", true),
            ("1", true),
            ("yes", true),
            ("On", true),
            ("false", false),
            ("0", false),
            ("NO", false),
            ("off", false),
        ] {
            let mut vars = base_vars();
            vars.insert("KEYCLOAK_INTROSPECT".to_string(), raw.to_string());
            let config = GuardConfig::from_vars(&vars).unwrap();
            assert_eq!(config.introspect, expected, "value {raw:?}");
        }
    }

    #[test]
    fn test_introspect_rejects_garbage() {
        let mut vars = base_vars();
        vars.insert("KEYCLOAK_INTROSPECT".to_string(), "maybe".to_string());

        let result = GuardConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidBool(msg)) if msg.contains("KEYCLOAK_INTROSPECT"))
        );
    }

    #[test]
    fn test_blank_namespace_is_ignored() {
        let mut vars = base_vars();
        vars.insert("KEYCLOAK_CACHE_NAMESPACE".to_string(), "  ".to_string());

        let config = GuardConfig::from_vars(&vars).unwrap();
        assert!(config.cache_namespace.is_none());
    }

    #[test]
    fn test_leeway_rejects_too_large() {
        let mut vars = base_vars();
        vars.insert("KEYCLOAK_LEEWAY_SECONDS".to_string(), "601".to_string());

        let result = GuardConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidLeeway(msg)) if msg.contains("must not exceed 600"))
        );
    }

    #[test]
    fn test_leeway_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("KEYCLOAK_LEEWAY_SECONDS".to_string(), "-5".to_string());

        let result = GuardConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidLeeway(msg)) if msg.contains("non-negative integer"))
        );
    }

    #[test]
    fn test_http_timeout_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("KEYCLOAK_HTTP_TIMEOUT_SECONDS".to_string(), "0".to_string());

        let result = GuardConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidHttpTimeout(_))));
    }

    #[test]
    fn test_builder_matches_env_defaults() {
        let built = GuardConfig::new("https://sso/realm", "orders-api")
            .with_client_secret("s")
            .with_introspect(false)
            .with_cache_namespace("acme")
            .with_leeway_seconds(5)
            .with_http_timeout(Duration::from_secs(2));

        assert_eq!(built.client_secret.expose_secret(), "s");
        assert!(!built.introspect);
        assert_eq!(built.cache_namespace.as_deref(), Some("acme"));
        assert_eq!(built.leeway_seconds, 5);
        assert_eq!(built.http_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let mut vars = base_vars();
        vars.insert(
            "KEYCLOAK_CLIENT_SECRET".to_string(),
            "super-secret-value".to_string(),
        );
        let config = GuardConfig::from_vars(&vars).unwrap();

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-value"));
    }
}
