//! Admin-only handler.

use crate::routes::AppState;
use axum::extract::State;
use axum::{Extension, Json};
use keycloak_guard::middleware::require_role;
use keycloak_guard::{GuardError, LocalUser, Principal};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

/// Client role required on the configured resource.
pub const ADMIN_ROLE: &str = "admin";

/// Handler for GET /api/v1/admin
///
/// Returns 403 unless the token grants [`ADMIN_ROLE`] on the configured
/// client resource.
#[instrument(skip_all, name = "guard_service.handlers.admin")]
pub async fn get_admin(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal<LocalUser>>,
) -> Result<Json<Value>, GuardError> {
    require_role(&principal, &state.config.guard.client_resource, ADMIN_ROLE)?;

    tracing::info!(target: "guard_service.handlers.admin", "Admin endpoint accessed");

    Ok(Json(json!({"ok": true})))
}
