//! Per-request authentication decision.
//!
//! [`KeycloakGuard::authenticate`] takes the bearer token of one request and
//! produces a [`RequestAuth`]:
//!
//! 1. Provider metadata and realm key come from the [`DiscoveryCache`]
//! 2. With introspection enabled the token (or an empty string) is sent to
//!    the provider; an active token's claims are decoded without a signature
//!    check, since the provider vouched for it
//! 3. With introspection disabled the token is verified locally against the
//!    realm key and the discovery issuer; a missing token is rejected
//! 4. The claims are handed to the [`UserResolver`] to build the principal
//!
//! Inactive and missing tokens are a normal [`AuthState::Rejected`] result.
//! Discovery, introspection transport, token and user resolution failures are
//! returned as [`GuardError`].

use crate::auth::claims::Claims;
use crate::auth::discovery::DiscoveryCache;
use crate::auth::introspection::{IntrospectionOutcome, Introspector};
use crate::auth::roles;
use crate::auth::token;
use crate::auth::verifier::TokenVerifier;
use crate::config::GuardConfig;
use crate::errors::GuardError;
use crate::observability::metrics::record_authentication;
use crate::store::MetadataStore;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Something with a stable identifier.
pub trait Identity {
    fn identifier(&self) -> Option<String>;
}

/// Looks up or constructs the local user for a set of verified claims.
#[async_trait]
pub trait UserResolver: Send + Sync {
    type User: Identity + Clone + Send + Sync + 'static;

    async fn resolve(&self, claims: &Claims) -> Result<Self::User, GuardError>;
}

/// Placeholder local identity built straight from token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalUser {
    /// The token subject. Lightweight access tokens may omit it.
    pub id: Option<String>,
    pub username: Option<String>,
}

impl Identity for LocalUser {
    fn identifier(&self) -> Option<String> {
        self.id.clone()
    }
}

/// [`UserResolver`] that never touches storage: `sub` becomes the id and
/// `preferred_username` the username.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectUserResolver;

#[async_trait]
impl UserResolver for SubjectUserResolver {
    type User = LocalUser;

    async fn resolve(&self, claims: &Claims) -> Result<LocalUser, GuardError> {
        Ok(LocalUser {
            id: claims.subject().map(str::to_string),
            username: claims.preferred_username().map(str::to_string),
        })
    }
}

/// Resolved user plus the claims it was resolved from. Request-scoped.
#[derive(Debug, Clone)]
pub struct Principal<U> {
    pub user: U,
    pub claims: Claims,
}

impl<U: Identity> Principal<U> {
    pub fn id(&self) -> Option<String> {
        self.user.identifier()
    }
}

/// Why a request was turned away without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No bearer token and local verification configured.
    MissingToken,

    /// The provider reported the token inactive.
    Inactive,

    /// The provider answered introspection with an `error`.
    ProviderError(String),
}

/// Terminal state of one authentication attempt.
#[derive(Debug, Clone)]
pub enum AuthState<U> {
    Rejected(Rejection),
    PrincipalResolved(Principal<U>),
}

/// Authentication result attached to a request.
#[derive(Debug, Clone)]
pub struct RequestAuth<U> {
    state: AuthState<U>,
    client_resource: String,
}

impl<U: Identity> RequestAuth<U> {
    pub fn new(state: AuthState<U>, client_resource: impl Into<String>) -> Self {
        Self {
            state,
            client_resource: client_resource.into(),
        }
    }

    pub fn state(&self) -> &AuthState<U> {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::PrincipalResolved(_))
    }

    pub fn is_guest(&self) -> bool {
        !self.is_authenticated()
    }

    pub fn current_principal(&self) -> Option<&Principal<U>> {
        match &self.state {
            AuthState::PrincipalResolved(principal) => Some(principal),
            AuthState::Rejected(_) => None,
        }
    }

    pub fn into_principal(self) -> Option<Principal<U>> {
        match self.state {
            AuthState::PrincipalResolved(principal) => Some(principal),
            AuthState::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match &self.state {
            AuthState::Rejected(rejection) => Some(rejection),
            AuthState::PrincipalResolved(_) => None,
        }
    }

    pub fn principal_id(&self) -> Option<String> {
        self.current_principal().and_then(Principal::id)
    }

    /// Whether the token grants `role` on the configured client resource.
    /// False when unauthenticated.
    pub fn has_role(&self, role: &str) -> bool {
        self.current_principal()
            .is_some_and(|p| roles::has_role(&p.claims, &self.client_resource, role))
    }

    /// The decoded claims as compact JSON.
    pub fn token_claims(&self) -> Option<String> {
        self.current_principal().and_then(|p| p.claims.to_json())
    }
}

/// Keycloak bearer-token guard.
pub struct KeycloakGuard<R> {
    config: GuardConfig,
    discovery: DiscoveryCache,
    introspector: Introspector,
    verifier: TokenVerifier,
    resolver: R,
}

impl<R: UserResolver> KeycloakGuard<R> {
    /// Create a guard around an existing HTTP client.
    pub fn new(
        config: GuardConfig,
        http_client: reqwest::Client,
        store: Arc<dyn MetadataStore>,
        resolver: R,
    ) -> Self {
        let discovery = DiscoveryCache::new(
            config.well_known_url.clone(),
            http_client.clone(),
            store,
            config.cache_namespace.as_deref(),
        );

        Self {
            introspector: Introspector::new(http_client),
            verifier: TokenVerifier::new(Duration::from_secs(config.leeway_seconds)),
            discovery,
            config,
            resolver,
        }
    }

    /// Create a guard with an HTTP client honoring `config.http_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Internal` if the HTTP client cannot be built.
    pub fn from_config(
        config: GuardConfig,
        store: Arc<dyn MetadataStore>,
        resolver: R,
    ) -> Result<Self, GuardError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| {
                GuardError::Internal(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::new(config, http_client, store, resolver))
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn discovery(&self) -> &DiscoveryCache {
        &self.discovery
    }

    fn strategy(&self) -> &'static str {
        if self.config.introspect {
            "introspection"
        } else {
            "local"
        }
    }

    /// Decide whether the request carrying `token` is authenticated.
    ///
    /// # Errors
    ///
    /// - `GuardError::InvalidDiscovery` if provider metadata is unavailable
    /// - `GuardError::Introspection` if the introspection call fails
    /// - `GuardError::Token` if the token cannot be decoded or verified
    /// - Whatever the [`UserResolver`] returns
    #[instrument(skip_all, fields(strategy = self.strategy()))]
    pub async fn authenticate(
        &self,
        token: Option<&str>,
    ) -> Result<RequestAuth<R::User>, GuardError> {
        let start = Instant::now();
        let result = self.decide(token).await;

        let outcome = match &result {
            Ok(AuthState::PrincipalResolved(_)) => "authenticated",
            Ok(AuthState::Rejected(_)) => "rejected",
            Err(e) => e.metric_label(),
        };
        record_authentication(self.strategy(), outcome, start.elapsed());

        match &result {
            Ok(AuthState::PrincipalResolved(_)) => {
                tracing::debug!(target: "keycloak_guard.guard", "Request authenticated");
            }
            Ok(AuthState::Rejected(rejection)) => {
                tracing::debug!(target: "keycloak_guard.guard", rejection = ?rejection, "Request rejected");
            }
            Err(e) => {
                tracing::debug!(target: "keycloak_guard.guard", error = %e, "Authentication failed");
            }
        }

        result.map(|state| RequestAuth::new(state, self.config.client_resource.clone()))
    }

    async fn decide(&self, token: Option<&str>) -> Result<AuthState<R::User>, GuardError> {
        let (metadata, key) = self.discovery.ensure_metadata().await?;

        let claims = if self.config.introspect {
            let raw = token.unwrap_or("");
            let outcome = self
                .introspector
                .introspect(
                    raw,
                    &metadata.introspection_endpoint,
                    &self.config.client_resource,
                    &self.config.client_secret,
                )
                .await?;

            match outcome {
                IntrospectionOutcome::Active => token::decode(raw)?,
                IntrospectionOutcome::Inactive => {
                    return Ok(AuthState::Rejected(Rejection::Inactive));
                }
                IntrospectionOutcome::Error(cause) => {
                    return Ok(AuthState::Rejected(Rejection::ProviderError(cause)));
                }
            }
        } else {
            let Some(raw) = token else {
                return Ok(AuthState::Rejected(Rejection::MissingToken));
            };
            self.verifier.verify(raw, &key, &metadata.issuer)?
        };

        let user = self.resolver.resolve(&claims).await?;
        Ok(AuthState::PrincipalResolved(Principal { user, claims }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn principal(claims: serde_json::Value) -> Principal<LocalUser> {
        let claims: Claims = serde_json::from_value(claims).unwrap();
        Principal {
            user: LocalUser {
                id: claims.subject().map(str::to_string),
                username: None,
            },
            claims,
        }
    }

    #[tokio::test]
    async fn test_subject_resolver_maps_claims() {
        let claims: Claims = serde_json::from_value(json!({
            "sub": "f3a1", "preferred_username": "alice"
        }))
        .unwrap();

        let user = SubjectUserResolver.resolve(&claims).await.unwrap();

        assert_eq!(user.id.as_deref(), Some("f3a1"));
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.identifier(), Some("f3a1".to_string()));
    }

    #[tokio::test]
    async fn test_subject_resolver_tolerates_missing_subject() {
        let user = SubjectUserResolver.resolve(&Claims::default()).await.unwrap();
        assert!(user.identifier().is_none());
    }

    #[test]
    fn test_request_auth_resolved() {
        let auth = RequestAuth::new(
            AuthState::PrincipalResolved(principal(json!({
                "sub": "u-1",
                "resource_access": {"orders-api": {"roles": ["admin"]}}
            }))),
            "orders-api",
        );

        assert!(auth.is_authenticated());
        assert!(!auth.is_guest());
        assert!(auth.rejection().is_none());
        assert_eq!(auth.principal_id(), Some("u-1".to_string()));
        assert!(auth.has_role("admin"));
        assert!(!auth.has_role("owner"));

        let claims: serde_json::Value =
            serde_json::from_str(&auth.token_claims().unwrap()).unwrap();
        assert_eq!(claims["sub"], "u-1");
    }

    #[test]
    fn test_request_auth_role_uses_configured_resource() {
        let auth = RequestAuth::new(
            AuthState::PrincipalResolved(principal(json!({
                "sub": "u-1",
                "resource_access": {"billing": {"roles": ["admin"]}}
            }))),
            "orders-api",
        );

        assert!(!auth.has_role("admin"));
    }

    #[test]
    fn test_request_auth_rejected() {
        let auth: RequestAuth<LocalUser> =
            RequestAuth::new(AuthState::Rejected(Rejection::Inactive), "orders-api");

        assert!(!auth.is_authenticated());
        assert!(auth.is_guest());
        assert!(auth.current_principal().is_none());
        assert!(auth.principal_id().is_none());
        assert!(!auth.has_role("admin"));
        assert!(auth.token_claims().is_none());
        assert_eq!(auth.rejection(), Some(&Rejection::Inactive));
        assert!(auth.into_principal().is_none());
    }

    #[test]
    fn test_from_config_builds_guard() {
        let config = crate::config::GuardConfig::new("https://sso/realms/a/.well-known", "orders-api")
            .with_introspect(false);
        let guard = KeycloakGuard::from_config(
            config,
            Arc::new(crate::store::InMemoryStore::new()),
            SubjectUserResolver,
        )
        .unwrap();

        assert_eq!(guard.strategy(), "local");
        assert_eq!(guard.config().client_resource, "orders-api");
        assert_eq!(guard.discovery().cache_keys().metadata, "wellKnown");
    }
}
