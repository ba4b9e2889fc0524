//! Authentication middleware for protected routes.
//!
//! Extracts the bearer token from the Authorization header, runs the
//! [`KeycloakGuard`], and injects the
//! [`RequestAuth`](crate::guard::RequestAuth) and [`Principal`] into request
//! extensions.

use crate::errors::GuardError;
use crate::guard::{Identity, KeycloakGuard, Principal, UserResolver};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Extract the bearer token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. Returns `None` for a missing or
/// non-UTF-8 header, another scheme, or an empty token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Authentication middleware backed by a [`KeycloakGuard`].
///
/// # Response
///
/// - 401 with `WWW-Authenticate` if the token is missing, inactive or invalid
/// - 503 if provider discovery or introspection fails
/// - Otherwise continues with `RequestAuth` and [`Principal`] in extensions
#[instrument(skip_all, name = "keycloak_guard.middleware.auth")]
pub async fn require_keycloak_auth<R>(
    State(guard): State<Arc<KeycloakGuard<R>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GuardError>
where
    R: UserResolver + 'static,
{
    let token = extract_bearer_token(req.headers());
    if token.is_none() {
        tracing::debug!(target: "keycloak_guard.middleware.auth", "No bearer token on request");
    }

    let auth = guard.authenticate(token).await?;

    let Some(principal) = auth.current_principal().cloned() else {
        tracing::debug!(
            target: "keycloak_guard.middleware.auth",
            rejection = ?auth.rejection(),
            "Request not authenticated"
        );
        return Err(GuardError::Unauthenticated);
    };

    req.extensions_mut().insert(principal);
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// Extension trait for extracting the principal from a request.
pub trait PrincipalExt {
    /// Returns `None` if the auth middleware was not applied to this request.
    fn principal<U: Clone + Send + Sync + 'static>(&self) -> Option<&Principal<U>>;
}

impl<B> PrincipalExt for axum::extract::Request<B> {
    fn principal<U: Clone + Send + Sync + 'static>(&self) -> Option<&Principal<U>> {
        self.extensions().get::<Principal<U>>()
    }
}

/// Require `role` on `resource` for an authenticated principal.
///
/// # Errors
///
/// Returns `GuardError::Forbidden` if the role is not granted.
pub fn require_role<U: Identity>(
    principal: &Principal<U>,
    resource: &str,
    role: &str,
) -> Result<(), GuardError> {
    if crate::auth::roles::has_role(&principal.claims, resource, role) {
        return Ok(());
    }

    tracing::debug!(
        target: "keycloak_guard.middleware.auth",
        resource = %resource,
        role = %role,
        "Principal lacks required role"
    );
    Err(GuardError::Forbidden(format!(
        "Role '{}' on '{}' is required",
        role, resource
    )))
}
