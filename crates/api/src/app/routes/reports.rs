use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use opsconsole_auth::Principal;
use opsconsole_core::ReportId;
use opsconsole_infra::Services;
use opsconsole_infra::services::reports::ReviewRequest;
use opsconsole_reports::{NewComment, NewReport, ReportPatch, ReportQuery};

use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_reports).post(create_report))
        .route(
            "/:id",
            get(get_report).patch(update_report).delete(delete_report),
        )
        .route("/:id/submit", post(submit_report))
        .route("/:id/review", post(review_report))
        .route("/:id/comments", get(list_comments).post(add_comment))
}

fn report_id(raw: &str) -> Result<ReportId, axum::response::Response> {
    errors::parse_id(raw, "report")
}

pub async fn list_reports(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ReportQuery>,
) -> axum::response::Response {
    errors::reply_items(services.list_reports(&principal, &query).await)
}

pub async fn create_report(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewReport>,
) -> axum::response::Response {
    errors::reply(StatusCode::CREATED, services.create_report(&principal, body).await)
}

pub async fn get_report(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match report_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.get_report(&principal, id).await)
}

pub async fn update_report(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<ReportPatch>,
) -> axum::response::Response {
    let id = match report_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.update_report(&principal, id, patch).await)
}

pub async fn delete_report(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match report_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_report(&principal, id).await)
}

pub async fn submit_report(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match report_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.submit_report(&principal, id).await)
}

/// POST /reports/:id/review `{ "decision": "start_review" | "approve" | "reject" | "escalate", "note": ... }`
pub async fn review_report(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> axum::response::Response {
    let id = match report_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.review_report(&principal, id, body).await)
}

pub async fn list_comments(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match report_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply_items(services.list_report_comments(&principal, id).await)
}

pub async fn add_comment(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<NewComment>,
) -> axum::response::Response {
    let id = match report_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(
        StatusCode::CREATED,
        services.add_report_comment(&principal, id, body).await,
    )
}
