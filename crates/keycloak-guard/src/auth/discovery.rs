//! Provider discovery and realm signing key cache.
//!
//! Fetches the OpenID discovery document from the configured `well-known`
//! URL, then the realm document published at the `issuer` URL, whose
//! `public_key` field holds the realm's signing key. Both are written to the
//! injected [`MetadataStore`] under fixed key names and served from there
//! until the store evicts them.
//!
//! # Concurrency
//!
//! Cold-cache population is single-flight: concurrent callers queue on a
//! mutex and re-check the store once they hold it, so only the first caller
//! goes to the network.

use crate::errors::GuardError;
use crate::observability::metrics::{record_discovery_fetch, record_metadata_cache};
use crate::store::MetadataStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::instrument;

/// Store key for the serialized discovery metadata.
pub const WELL_KNOWN_CACHE_KEY: &str = "wellKnown";

/// Store key for the serialized realm public key.
pub const PUBLIC_KEY_CACHE_KEY: &str = "keycloak_public_key";

/// Discovery metadata the guard depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer URL; also the location of the realm document.
    pub issuer: String,

    /// RFC 7662 introspection endpoint.
    pub introspection_endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
}

/// Realm signing key as published by the provider.
///
/// Keycloak publishes the bare base64 DER `SubjectPublicKeyInfo`; a full PEM
/// document is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the key as a PEM `PUBLIC KEY` document.
    pub fn to_pem(&self) -> String {
        let material = self.0.trim();
        if material.starts_with("-----BEGIN") {
            return material.to_string();
        }

        let body: String = material.split_whitespace().collect();
        let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");
        for line in body.as_bytes().chunks(64) {
            pem.push_str(&String::from_utf8_lossy(line));
            pem.push('\n');
        }
        pem.push_str("-----END PUBLIC KEY-----\n");
        pem
    }
}

/// Discovery document as served; fields validated before use.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    issuer: Option<String>,
    introspection_endpoint: Option<String>,
    #[serde(default)]
    jwks_uri: Option<String>,
    #[serde(default)]
    token_endpoint: Option<String>,
}

/// Realm document served at the issuer URL.
#[derive(Debug, Deserialize)]
struct RealmDocument {
    public_key: Option<String>,
}

/// Store key names, optionally prefixed with a realm namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    pub metadata: String,
    pub public_key: String,
}

impl CacheKeys {
    pub fn new(namespace: Option<&str>) -> Self {
        match namespace {
            Some(ns) => Self {
                metadata: format!("{}:{}", ns, WELL_KNOWN_CACHE_KEY),
                public_key: format!("{}:{}", ns, PUBLIC_KEY_CACHE_KEY),
            },
            None => Self {
                metadata: WELL_KNOWN_CACHE_KEY.to_string(),
                public_key: PUBLIC_KEY_CACHE_KEY.to_string(),
            },
        }
    }
}

/// Discovery and signing key cache.
pub struct DiscoveryCache {
    /// URL of the discovery document.
    well_known_url: String,

    /// HTTP client for discovery and realm key fetches.
    http_client: reqwest::Client,

    /// Shared store holding the serialized metadata.
    store: Arc<dyn MetadataStore>,

    /// Store key names.
    keys: CacheKeys,

    /// Serializes cold-cache population.
    populate_lock: Mutex<()>,
}

impl DiscoveryCache {
    /// Create a discovery cache.
    ///
    /// # Arguments
    ///
    /// * `well_known_url` - Discovery document URL
    /// * `http_client` - Client used for both fetches
    /// * `store` - Shared metadata store
    /// * `namespace` - Optional cache key prefix
    pub fn new(
        well_known_url: String,
        http_client: reqwest::Client,
        store: Arc<dyn MetadataStore>,
        namespace: Option<&str>,
    ) -> Self {
        Self {
            well_known_url,
            http_client,
            store,
            keys: CacheKeys::new(namespace),
            populate_lock: Mutex::new(()),
        }
    }

    /// Store key names in use.
    pub fn cache_keys(&self) -> &CacheKeys {
        &self.keys
    }

    /// Return discovery metadata and signing key, fetching them on a cold cache.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::InvalidDiscovery` if either document cannot be
    /// fetched, is not JSON, or lacks a required field.
    #[instrument(skip_all)]
    pub async fn ensure_metadata(&self) -> Result<(ProviderMetadata, SigningKey), GuardError> {
        if let Some(cached) = self.load_cached().await {
            record_metadata_cache("hit");
            return Ok(cached);
        }
        record_metadata_cache("miss");

        let _populating = self.populate_lock.lock().await;

        // Another caller may have populated the store while we waited
        if let Some(cached) = self.load_cached().await {
            tracing::debug!(target: "keycloak_guard.discovery", "Metadata populated by concurrent caller");
            return Ok(cached);
        }

        self.fetch_and_store().await
    }

    /// Re-fetch both documents and overwrite the cached entries.
    ///
    /// Used after a realm key rotation.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<(ProviderMetadata, SigningKey), GuardError> {
        let _populating = self.populate_lock.lock().await;
        self.fetch_and_store().await
    }

    /// Read both entries from the store. Any missing, empty or undecodable
    /// entry counts as a cold cache.
    async fn load_cached(&self) -> Option<(ProviderMetadata, SigningKey)> {
        if !(self.store.has(&self.keys.metadata).await && self.store.has(&self.keys.public_key).await)
        {
            return None;
        }

        let metadata_json = self.store.get(&self.keys.metadata).await?;
        let key_json = self.store.get(&self.keys.public_key).await?;

        let metadata: ProviderMetadata = match serde_json::from_str(&metadata_json) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(target: "keycloak_guard.discovery", error = %e, "Cached discovery metadata is unreadable, refetching");
                return None;
            }
        };
        let key: SigningKey = match serde_json::from_str(&key_json) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(target: "keycloak_guard.discovery", error = %e, "Cached public key is unreadable, refetching");
                return None;
            }
        };

        if metadata.issuer.is_empty()
            || metadata.introspection_endpoint.is_empty()
            || key.as_str().trim().is_empty()
        {
            return None;
        }

        Some((metadata, key))
    }

    async fn fetch_and_store(&self) -> Result<(ProviderMetadata, SigningKey), GuardError> {
        let start = Instant::now();
        let result = self.fetch().await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_discovery_fetch(status, start.elapsed());

        let (metadata, key) = result?;

        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| GuardError::InvalidDiscovery(e.to_string()))?;
        let key_json =
            serde_json::to_string(&key).map_err(|e| GuardError::InvalidDiscovery(e.to_string()))?;

        self.store.put(&self.keys.metadata, metadata_json).await;
        self.store.put(&self.keys.public_key, key_json).await;

        tracing::info!(
            target: "keycloak_guard.discovery",
            issuer = %metadata.issuer,
            "Provider metadata cached"
        );

        Ok((metadata, key))
    }

    async fn fetch(&self) -> Result<(ProviderMetadata, SigningKey), GuardError> {
        tracing::debug!(target: "keycloak_guard.discovery", url = %self.well_known_url, "Fetching discovery document");

        let document: DiscoveryDocument = self.get_json(&self.well_known_url).await?;

        let issuer = non_empty(document.issuer, "issuer")?;
        let introspection_endpoint =
            non_empty(document.introspection_endpoint, "introspection_endpoint")?;

        tracing::debug!(target: "keycloak_guard.discovery", issuer = %issuer, "Fetching realm public key");

        let realm: RealmDocument = self.get_json(&issuer).await?;
        let public_key = non_empty(realm.public_key, "public_key")?;

        Ok((
            ProviderMetadata {
                issuer,
                introspection_endpoint,
                jwks_uri: document.jwks_uri,
                token_endpoint: document.token_endpoint,
            },
            SigningKey::new(public_key),
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GuardError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            tracing::error!(target: "keycloak_guard.discovery", url = %url, error = %e, "Provider request failed");
            GuardError::InvalidDiscovery(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(target: "keycloak_guard.discovery", url = %url, status = %status, "Provider returned error status");
            return Err(GuardError::InvalidDiscovery(format!(
                "{} returned status {}",
                url, status
            )));
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!(target: "keycloak_guard.discovery", url = %url, error = %e, "Provider returned malformed JSON");
            GuardError::InvalidDiscovery(e.to_string())
        })
    }
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, GuardError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GuardError::InvalidDiscovery(format!("missing field `{}`", field)))
}
