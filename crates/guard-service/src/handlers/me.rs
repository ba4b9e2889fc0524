//! Current user handler.
//!
//! Returns the resolved principal and the claims it was built from.

use crate::routes::AppState;
use axum::extract::State;
use axum::{Extension, Json};
use keycloak_guard::auth::{roles, Claims};
use keycloak_guard::{LocalUser, Principal};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Response for `/api/v1/me`.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Token subject.
    pub id: Option<String>,

    /// Keycloak `preferred_username`.
    pub username: Option<String>,

    /// Client roles granted on the configured resource.
    pub roles: Vec<String>,

    /// Full decoded claim set.
    pub claims: Claims,
}

/// Handler for GET /api/v1/me
///
/// Requires the Keycloak auth middleware.
///
/// ## Response
///
/// ```json
/// {
///   "id": "f3a1...",
///   "username": "alice",
///   "roles": ["admin"],
///   "claims": { "sub": "f3a1...", "iss": "...", "exp": 1234567890 }
/// }
/// ```
#[instrument(skip_all, name = "guard_service.handlers.me")]
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal<LocalUser>>,
) -> Json<MeResponse> {
    tracing::debug!(target: "guard_service.handlers.me", "Returning principal");

    let roles = roles::resource_roles(&principal.claims, &state.config.guard.client_resource)
        .into_iter()
        .map(str::to_string)
        .collect();

    Json(MeResponse {
        id: principal.user.id,
        username: principal.user.username,
        roles,
        claims: principal.claims,
    })
}
