//! Admin routes for identity management.
//!
//! Users, their department access grants and password resets. Scoping and
//! privilege-escalation checks live in the user management policy; these
//! handlers only translate HTTP.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};

use opsconsole_auth::Principal;
use opsconsole_core::{DepartmentId, UserId};
use opsconsole_infra::Services;
use opsconsole_infra::services::admin::{CreateUser, UpdateUser};

use crate::app::routes::rbac;
use crate::app::{dto, errors};

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", patch(update_user).delete(delete_user))
        .route(
            "/users/:id/departments",
            get(list_access).post(grant_access).put(replace_access),
        )
        .route("/users/:id/departments/:department_id", delete(revoke_access))
        .route("/users/:id/password", post(set_password))
        .route("/password-resets", post(initiate_password_reset))
        .nest("/rbac", rbac::router())
}

fn user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    errors::parse_id(raw, "user")
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_users(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply_items(services.list_users(&principal).await)
}

pub async fn create_user(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateUser>,
) -> axum::response::Response {
    errors::reply(StatusCode::CREATED, services.create_user(&principal, body).await)
}

pub async fn update_user(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUser>,
) -> axum::response::Response {
    let id = match user_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.update_user(&principal, id, body).await)
}

pub async fn delete_user(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match user_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_user(&principal, id).await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Department access (super_admin)
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_access(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match user_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply_items(services.list_department_access(&principal, id).await)
}

pub async fn grant_access(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::GrantAccessRequest>,
) -> axum::response::Response {
    let id = match user_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(
        StatusCode::CREATED,
        services
            .grant_department_access(&principal, id, body.department_id)
            .await,
    )
}

/// PUT /admin/users/:id/departments replaces the whole grant set.
pub async fn replace_access(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReplaceAccessRequest>,
) -> axum::response::Response {
    let id = match user_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply_items(
        services
            .replace_department_access(&principal, id, body.department_ids)
            .await,
    )
}

pub async fn revoke_access(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path((id, department_id)): Path<(String, String)>,
) -> axum::response::Response {
    let id = match user_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let department_id: DepartmentId = match errors::parse_id(&department_id, "department") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(
        services
            .revoke_department_access(&principal, id, department_id)
            .await,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Passwords (super_admin)
// ─────────────────────────────────────────────────────────────────────────────

pub async fn set_password(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetPasswordRequest>,
) -> axum::response::Response {
    let id = match user_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(
        services
            .set_user_password(&principal, id, &body.new_password)
            .await,
    )
}

/// POST /admin/password-resets `{ "user_id": ... }`
///
/// The user must complete the reset at next login; the token is handed out
/// by the login response, never by this endpoint.
pub async fn initiate_password_reset(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::InitiateResetRequest>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::CREATED,
        services
            .initiate_password_reset(&principal, body.user_id)
            .await,
    )
}
