//! Role and permission catalogue plus access explanations.
//!
//! Admins use these to see what each role carries and why a given user was
//! allowed or refused a permission in a department.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use opsconsole_auth::{
    Permission, Principal, RbacRegistry, authorize, explain_authorization,
    permissions::USERS_MANAGE,
};
use opsconsole_core::UserId;
use opsconsole_infra::Services;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/roles/:name", get(get_role))
        .route("/permissions", get(list_permissions))
        .route("/permissions/:name", get(get_permission))
        .route("/explain", get(explain_authorization_decision))
        .route("/explain/:user_id", get(explain_user_authorization))
}

fn require_user_admin(principal: &Principal) -> Result<(), axum::response::Response> {
    authorize(principal, &USERS_MANAGE)
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}

/// GET /admin/rbac/roles, ordered staff first
pub async fn list_roles(Extension(principal): Extension<Principal>) -> axum::response::Response {
    if let Err(r) = require_user_admin(&principal) {
        return r;
    }

    let mut roles: Vec<_> = RbacRegistry::build().roles.into_values().collect();
    roles.sort_by_key(|r| r.rank);

    (StatusCode::OK, Json(serde_json::json!({ "roles": roles }))).into_response()
}

/// GET /admin/rbac/roles/:name
pub async fn get_role(
    Extension(principal): Extension<Principal>,
    Path(name): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require_user_admin(&principal) {
        return r;
    }

    let registry = RbacRegistry::build();
    match registry.roles.get(&name) {
        Some(role) => (StatusCode::OK, Json(serde_json::json!({ "role": role }))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "role not found"),
    }
}

/// GET /admin/rbac/permissions
pub async fn list_permissions(
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    if let Err(r) = require_user_admin(&principal) {
        return r;
    }

    let permissions: Vec<_> = RbacRegistry::build().permissions.into_values().collect();

    (StatusCode::OK, Json(serde_json::json!({ "permissions": permissions }))).into_response()
}

/// GET /admin/rbac/permissions/:name
pub async fn get_permission(
    Extension(principal): Extension<Principal>,
    Path(name): Path<String>,
) -> axum::response::Response {
    if let Err(r) = require_user_admin(&principal) {
        return r;
    }

    let registry = RbacRegistry::build();
    match registry.permissions.get(&name) {
        Some(perm) => {
            (StatusCode::OK, Json(serde_json::json!({ "permission": perm }))).into_response()
        }
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "permission not found"),
    }
}

/// GET /admin/rbac/explain?permission=..&department_id=..
///
/// Open to every signed-in user; it only ever describes the caller.
pub async fn explain_authorization_decision(
    Extension(principal): Extension<Principal>,
    Query(query): Query<dto::ExplainQuery>,
) -> axum::response::Response {
    let required = Permission::new(query.permission);
    let explanation = explain_authorization(&principal, &required, query.department_id);

    (StatusCode::OK, Json(serde_json::json!({ "explanation": explanation }))).into_response()
}

/// GET /admin/rbac/explain/:user_id?permission=..
pub async fn explain_user_authorization(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    Query(query): Query<dto::ExplainQuery>,
) -> axum::response::Response {
    if let Err(r) = require_user_admin(&principal) {
        return r;
    }

    let user_id: UserId = match errors::parse_id(&user_id, "user") {
        Ok(v) => v,
        Err(r) => return r,
    };

    // An account that no longer exists resolves as unauthenticated; report it as missing.
    let subject = match services.resolve_principal(user_id).await {
        Ok(p) => p,
        Err(opsconsole_infra::ServiceError::Unauthenticated(_)) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found");
        }
        Err(e) => return errors::service_error_to_response(e),
    };

    let required = Permission::new(query.permission);
    let explanation = explain_authorization(&subject, &required, query.department_id);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "user_id": user_id.to_string(),
            "user_email": subject.email,
            "explanation": explanation,
        })),
    )
        .into_response()
}
