//! Mock Keycloak realm backed by wiremock.
//!
//! Serves the three endpoints the guard talks to:
//!
//! - `GET  /realms/{realm}/.well-known/openid-configuration`
//! - `GET  /realms/{realm}` (realm document with `public_key`)
//! - `POST /realms/{realm}/protocol/openid-connect/token/introspect`
//!
//! Discovery and realm documents are mounted on start; the introspection
//! response is mounted per test.

use crate::crypto_fixtures::realm_public_key;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A running mock realm.
pub struct MockKeycloak {
    server: MockServer,
    realm: String,
}

impl MockKeycloak {
    /// Start a realm publishing the fixture RSA public key.
    pub async fn start(realm: &str) -> Self {
        Self::start_with_key(realm, &realm_public_key()).await
    }

    /// Start a realm publishing `public_key` in its realm document.
    pub async fn start_with_key(realm: &str, public_key: &str) -> Self {
        let keycloak = Self::start_bare(realm).await;
        keycloak.mount_discovery().await;
        keycloak.mount_realm_key(public_key).await;
        keycloak
    }

    /// Start a realm with nothing mounted.
    pub async fn start_bare(realm: &str) -> Self {
        Self {
            server: MockServer::start().await,
            realm: realm.to_string(),
        }
    }

    /// The underlying wiremock server, for custom mounts.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Realm base URL, which Keycloak also uses as the issuer.
    pub fn issuer(&self) -> String {
        format!("{}{}", self.server.uri(), self.realm_path())
    }

    pub fn well_known_url(&self) -> String {
        format!("{}{}", self.server.uri(), self.well_known_path())
    }

    pub fn introspection_endpoint(&self) -> String {
        format!("{}{}", self.server.uri(), self.introspection_path())
    }

    fn realm_path(&self) -> String {
        format!("/realms/{}", self.realm)
    }

    fn well_known_path(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.realm_path())
    }

    fn introspection_path(&self) -> String {
        format!("{}/protocol/openid-connect/token/introspect", self.realm_path())
    }

    /// Mount the discovery document.
    pub async fn mount_discovery(&self) {
        let issuer = self.issuer();
        Mock::given(method("GET"))
            .and(path(self.well_known_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": issuer,
                "introspection_endpoint": self.introspection_endpoint(),
                "token_endpoint": format!("{issuer}/protocol/openid-connect/token"),
                "jwks_uri": format!("{issuer}/protocol/openid-connect/certs"),
                "id_token_signing_alg_values_supported": ["RS256", "PS256", "EdDSA"]
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount the realm document carrying `public_key`.
    pub async fn mount_realm_key(&self, public_key: &str) {
        Mock::given(method("GET"))
            .and(path(self.realm_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "realm": self.realm,
                "public_key": public_key,
                "token-service": format!("{}/protocol/openid-connect", self.issuer()),
                "tokens-not-before": 0
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer every introspection call with `body`.
    pub async fn mount_introspection(&self, body: Value) {
        self.mount_introspection_response(ResponseTemplate::new(200).set_body_json(body))
            .await;
    }

    /// Answer every introspection call with an arbitrary response.
    pub async fn mount_introspection_response(&self, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(self.introspection_path()))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// All requests received so far.
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .expect("request recording is enabled")
    }

    /// Number of requests received on `request_path` with `http_method`.
    pub async fn request_count(&self, http_method: &str, request_path: &str) -> usize {
        self.received_requests()
            .await
            .iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
            .count()
    }

    /// Discovery document fetches so far.
    pub async fn discovery_fetches(&self) -> usize {
        self.request_count("GET", &self.well_known_path()).await
    }

    /// Realm key fetches so far.
    pub async fn key_fetches(&self) -> usize {
        self.request_count("GET", &self.realm_path()).await
    }

    /// Introspection calls so far.
    pub async fn introspection_calls(&self) -> usize {
        self.request_count("POST", &self.introspection_path()).await
    }
}
