use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use opsconsole_auth::Principal;
use opsconsole_core::SystemEventId;
use opsconsole_infra::Services;
use opsconsole_monitoring::{AuditQuery, Heartbeat, NewSystemEvent};

use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/audit-logs", get(list_audit_logs))
        .route("/events", get(list_events).post(record_event))
        .route("/events/:id/resolve", post(resolve_event))
        .route("/metrics", get(system_metrics))
        .route("/reports", get(list_reports).post(generate_report))
}

/// Mounted under `/sessions`.
pub fn sessions_router() -> Router {
    Router::new()
        .route("/", get(list_sessions))
        .route("/heartbeat", post(heartbeat))
        .route("/end", post(end_session))
}

/// GET /monitoring/audit-logs?table_name=&action=&user_id=&since=&limit=
pub async fn list_audit_logs(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AuditQuery>,
) -> axum::response::Response {
    errors::reply_items(services.list_audit_logs(&principal, &query).await)
}

pub async fn list_events(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply_items(services.list_system_events(&principal).await)
}

pub async fn record_event(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewSystemEvent>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::CREATED,
        services.record_system_event(&principal, body).await,
    )
}

pub async fn resolve_event(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SystemEventId = match errors::parse_id(&id, "system event") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.resolve_system_event(&principal, id).await)
}

pub async fn system_metrics(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply(StatusCode::OK, services.system_metrics(&principal).await)
}

pub async fn list_reports(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply_items(services.list_system_reports(&principal).await)
}

pub async fn generate_report(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::CREATED,
        services.generate_system_report(&principal).await,
    )
}

// ── sessions ────────────────────────────────────────────────────────────────

pub async fn heartbeat(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    body: Option<Json<Heartbeat>>,
) -> axum::response::Response {
    let beat = body.map(|Json(b)| b).unwrap_or_default();
    errors::reply(StatusCode::OK, services.heartbeat(&principal, beat).await)
}

pub async fn end_session(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    match services.end_session(&principal).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ended": true }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /sessions (super_admin); idle sessions are swept first.
pub async fn list_sessions(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply_items(services.list_sessions(&principal).await)
}
