use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use opsconsole_auth::Principal;
use opsconsole_directory::ProfilePatch;
use opsconsole_infra::Services;

use crate::app::{dto, errors};

/// Mounted under `/profile`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(get_profile).patch(update_profile))
        .route("/password", post(change_password))
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<Services>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    errors::reply(StatusCode::OK, services.login(&body.email, &body.password).await)
}

/// POST /auth/password-resets/complete
pub async fn complete_password_reset(
    Extension(services): Extension<Arc<Services>>,
    Json(body): Json<dto::CompleteResetRequest>,
) -> axum::response::Response {
    match services
        .complete_password_reset(&body.token, &body.new_password)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "completed": true }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_profile(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply(StatusCode::OK, services.profile(&principal).await)
}

pub async fn update_profile(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(patch): Json<ProfilePatch>,
) -> axum::response::Response {
    errors::reply(StatusCode::OK, services.update_profile(&principal, patch).await)
}

pub async fn change_password(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::ChangePasswordRequest>,
) -> axum::response::Response {
    errors::no_content(
        services
            .change_password(&principal, &body.current_password, &body.new_password)
            .await,
    )
}
