use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};

use opsconsole_auth::Principal;
use opsconsole_core::{FleetId, FleetIssueId, MaintenanceRecordId};
use opsconsole_fleet::{FleetPatch, FleetQuery, NewFleetIssue, NewMaintenanceRecord};
use opsconsole_infra::Services;
use opsconsole_infra::services::fleet::CreateFleet;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/vehicles", get(list_fleets).post(create_fleet))
        .route(
            "/vehicles/:id",
            get(get_fleet).patch(update_fleet).delete(delete_fleet),
        )
        .route("/vehicles/:id/history", get(fleet_history))
        .route("/vehicles/:id/issues", get(list_fleet_issues).post(report_issue))
        .route("/issues", get(list_all_issues))
        .route("/issues/:id/resolve", post(resolve_issue))
        .route("/maintenance", get(list_maintenance).post(record_maintenance))
        .route("/maintenance/:id", delete(delete_maintenance))
        .route("/overview", get(maintenance_overview))
        .route("/stats", get(fleet_stats))
}

pub async fn list_fleets(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(scope): Query<dto::DepartmentScope>,
    Query(query): Query<FleetQuery>,
) -> axum::response::Response {
    errors::reply_items(
        services
            .list_fleets(&principal, scope.department_id, &query)
            .await,
    )
}

pub async fn get_fleet(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: FleetId = match errors::parse_id(&id, "fleet") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.get_fleet(&principal, id).await)
}

pub async fn create_fleet(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateFleet>,
) -> axum::response::Response {
    errors::reply(StatusCode::CREATED, services.create_fleet(&principal, body).await)
}

pub async fn update_fleet(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<FleetPatch>,
) -> axum::response::Response {
    let id: FleetId = match errors::parse_id(&id, "fleet") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.update_fleet(&principal, id, patch).await)
}

pub async fn delete_fleet(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: FleetId = match errors::parse_id(&id, "fleet") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_fleet(&principal, id).await)
}

pub async fn fleet_history(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: FleetId = match errors::parse_id(&id, "fleet") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply_items(services.fleet_history(&principal, id).await)
}

pub async fn list_fleet_issues(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Query(filter): Query<dto::IssueFilter>,
) -> axum::response::Response {
    let id: FleetId = match errors::parse_id(&id, "fleet") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply_items(
        services
            .list_fleet_issues(&principal, Some(id), filter.include_resolved)
            .await,
    )
}

pub async fn list_all_issues(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<dto::IssueFilter>,
) -> axum::response::Response {
    errors::reply_items(
        services
            .list_fleet_issues(&principal, None, filter.include_resolved)
            .await,
    )
}

pub async fn report_issue(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<NewFleetIssue>,
) -> axum::response::Response {
    let id: FleetId = match errors::parse_id(&id, "fleet") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(
        StatusCode::CREATED,
        services.report_fleet_issue(&principal, id, body).await,
    )
}

pub async fn resolve_issue(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: FleetIssueId = match errors::parse_id(&id, "fleet issue") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.resolve_fleet_issue(&principal, id).await)
}

pub async fn list_maintenance(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<dto::MaintenanceFilter>,
) -> axum::response::Response {
    errors::reply_items(services.list_maintenance(&principal, filter.fleet_id).await)
}

pub async fn record_maintenance(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewMaintenanceRecord>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::CREATED,
        services.record_maintenance(&principal, body).await,
    )
}

pub async fn delete_maintenance(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MaintenanceRecordId = match errors::parse_id(&id, "maintenance record") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_maintenance(&principal, id).await)
}

pub async fn maintenance_overview(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(window): Query<dto::DueWindow>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::OK,
        services
            .maintenance_overview(&principal, window.department_id, window.days)
            .await,
    )
}

pub async fn fleet_stats(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(window): Query<dto::DueWindow>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::OK,
        services
            .fleet_stats(&principal, window.department_id, window.days)
            .await,
    )
}
