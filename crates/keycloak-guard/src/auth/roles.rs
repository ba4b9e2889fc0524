//! Resource-scoped role checks against `resource_access`.
//!
//! Keycloak places client roles under
//! `resource_access.<client>.roles`. Any other shape means "no roles".

use crate::auth::claims::Claims;
use serde_json::Value;

/// Whether `claims` grant `role` on `resource`. Never fails.
pub fn has_role(claims: &Claims, resource: &str, role: &str) -> bool {
    roles_value(claims, resource)
        .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some(role)))
}

/// All string roles granted on `resource`, in token order.
pub fn resource_roles<'a>(claims: &'a Claims, resource: &str) -> Vec<&'a str> {
    roles_value(claims, resource)
        .map(|roles| roles.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn roles_value<'a>(claims: &'a Claims, resource: &str) -> Option<&'a Vec<Value>> {
    claims
        .resource_access()?
        .get(resource)?
        .get("roles")?
        .as_array()
}
