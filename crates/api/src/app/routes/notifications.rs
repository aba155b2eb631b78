use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use opsconsole_auth::Principal;
use opsconsole_core::NotificationId;
use opsconsole_infra::Services;
use opsconsole_infra::services::notifications::SendNotification;

use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/", get(inbox).post(send_notification))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
        .route("/:id", delete(delete_notification))
}

pub async fn inbox(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply_items(services.inbox(&principal).await)
}

pub async fn unread_count(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    match services.unread_count(&principal).await {
        Ok(count) => (StatusCode::OK, Json(json!({ "unread": count }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn mark_read(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: NotificationId = match errors::parse_id(&id, "notification") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(
        StatusCode::OK,
        services.mark_notification_read(&principal, id).await,
    )
}

pub async fn mark_all_read(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    match services.mark_all_notifications_read(&principal).await {
        Ok(updated) => (StatusCode::OK, Json(json!({ "updated": updated }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_notification(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: NotificationId = match errors::parse_id(&id, "notification") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_notification(&principal, id).await)
}

/// POST /notifications (users.manage): fan a notification out to users.
pub async fn send_notification(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<SendNotification>,
) -> axum::response::Response {
    match services.send_notification(&principal, body).await {
        Ok(sent) => (StatusCode::CREATED, Json(json!({ "items": sent }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
