//! Guard Service configuration.
//!
//! Configuration is loaded from environment variables. The guard's own
//! settings are delegated to [`GuardConfig`].

use keycloak_guard::config::{ConfigError as GuardConfigError, GuardConfig};
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Guard Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: SocketAddr,

    /// Keycloak guard settings.
    pub guard: GuardConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Guard(#[from] GuardConfigError),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let raw_bind = vars
            .get("BIND_ADDRESS")
            .map(String::as_str)
            .unwrap_or(DEFAULT_BIND_ADDRESS);
        let bind_address = raw_bind.parse().map_err(|e| {
            ConfigError::InvalidBindAddress(format!("'{}': {}", raw_bind, e))
        })?;

        Ok(ServiceConfig {
            bind_address,
            guard: GuardConfig::from_vars(vars)?,
        })
    }
}
