use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use opsconsole_auth::Principal;
use opsconsole_core::DepartmentId;
use opsconsole_directory::{DepartmentPatch, NewDepartment};
use opsconsole_infra::Services;

use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_departments).post(create_department))
        .route(
            "/:id",
            get(get_department)
                .patch(update_department)
                .delete(delete_department),
        )
}

pub async fn list_departments(
    Extension(services): Extension<Arc<Services>>,
) -> axum::response::Response {
    errors::reply_items(services.list_departments().await)
}

pub async fn get_department(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DepartmentId = match errors::parse_id(&id, "department") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.get_department(id).await)
}

pub async fn create_department(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewDepartment>,
) -> axum::response::Response {
    errors::reply(StatusCode::CREATED, services.create_department(&principal, body).await)
}

pub async fn update_department(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<DepartmentPatch>,
) -> axum::response::Response {
    let id: DepartmentId = match errors::parse_id(&id, "department") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.update_department(&principal, id, patch).await)
}

pub async fn delete_department(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DepartmentId = match errors::parse_id(&id, "department") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_department(&principal, id).await)
}
