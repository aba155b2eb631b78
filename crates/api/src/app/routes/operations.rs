use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use opsconsole_auth::Principal;
use opsconsole_core::{ActivityId, FieldUpdateId};
use opsconsole_infra::Services;
use opsconsole_infra::services::operations::{PostFieldUpdate, ScheduleActivity};
use opsconsole_operations::{ActivityPatch, ActivityQuery, FieldUpdatePatch, FieldUpdateQuery};

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/field-updates", get(list_field_updates).post(post_field_update))
        .route("/field-updates/board", get(field_board))
        .route(
            "/field-updates/:id",
            get(get_field_update)
                .patch(update_field_update)
                .delete(delete_field_update),
        )
        .route("/activities", get(list_activities).post(schedule_activity))
        .route("/activities/board", get(activity_board))
        .route(
            "/activities/:id",
            get(get_activity).patch(update_activity).delete(delete_activity),
        )
}

// ── field updates ───────────────────────────────────────────────────────────

pub async fn list_field_updates(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<FieldUpdateQuery>,
) -> axum::response::Response {
    errors::reply_items(services.list_field_updates(&principal, &query).await)
}

/// GET /operations/field-updates/board: urgent, pinned and the photo gallery.
pub async fn field_board(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(scope): Query<dto::DepartmentScope>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::OK,
        services.field_board(&principal, scope.department_id).await,
    )
}

pub async fn get_field_update(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: FieldUpdateId = match errors::parse_id(&id, "field update") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.get_field_update(&principal, id).await)
}

pub async fn post_field_update(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<PostFieldUpdate>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::CREATED,
        services.post_field_update(&principal, body).await,
    )
}

pub async fn update_field_update(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<FieldUpdatePatch>,
) -> axum::response::Response {
    let id: FieldUpdateId = match errors::parse_id(&id, "field update") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(
        StatusCode::OK,
        services.update_field_update(&principal, id, patch).await,
    )
}

pub async fn delete_field_update(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: FieldUpdateId = match errors::parse_id(&id, "field update") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_field_update(&principal, id).await)
}

// ── office activities ───────────────────────────────────────────────────────

pub async fn list_activities(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ActivityQuery>,
) -> axum::response::Response {
    errors::reply_items(services.list_activities(&principal, &query).await)
}

pub async fn activity_board(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(scope): Query<dto::DepartmentScope>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::OK,
        services.activity_board(&principal, scope.department_id).await,
    )
}

pub async fn get_activity(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ActivityId = match errors::parse_id(&id, "activity") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.get_activity(&principal, id).await)
}

pub async fn schedule_activity(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ScheduleActivity>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::CREATED,
        services.schedule_activity(&principal, body).await,
    )
}

pub async fn update_activity(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<ActivityPatch>,
) -> axum::response::Response {
    let id: ActivityId = match errors::parse_id(&id, "activity") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.update_activity(&principal, id, patch).await)
}

pub async fn delete_activity(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ActivityId = match errors::parse_id(&id, "activity") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_activity(&principal, id).await)
}
