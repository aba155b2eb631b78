use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};

use opsconsole_auth::Principal;
use opsconsole_core::{ApproverId, ClassificationId, ItemId, ItemRequestId, LocationId};
use opsconsole_infra::Services;
use opsconsole_infra::services::warehouse::{
    CreateClassification, CreateItem, CreateItemRequest, ImportItems,
};
use opsconsole_warehouse::{
    ApproverPatch, ClassificationPatch, ItemPatch, ItemQuery, LocationPatch, NewApprover,
    NewLocation, StockMovement, TransactionQuery,
};

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route(
            "/classifications",
            get(list_classifications).post(create_classification),
        )
        .route(
            "/classifications/:id",
            patch(update_classification).delete(delete_classification),
        )
        .route(
            "/classifications/:id/locations",
            get(list_locations).post(create_location),
        )
        .route("/locations/:id", patch(update_location).delete(delete_location))
        .route("/items", get(list_items).post(create_item))
        .route("/items/import", post(import_items))
        .route(
            "/items/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/items/:id/movements", post(move_stock))
        .route("/transactions", get(list_transactions))
        .route("/requests", get(list_requests).post(record_request))
        .route("/requests/:id", get(get_request).delete(delete_request))
        .route("/approvers", get(list_approvers).post(create_approver))
        .route("/approvers/:id", patch(update_approver))
        .route("/approvers/:id/deactivate", post(deactivate_approver))
        .route("/stats", get(inventory_stats))
        .route("/low-stock", get(low_stock))
        .route("/it-equipment", get(it_equipment))
}

// ── folders ─────────────────────────────────────────────────────────────────

pub async fn list_classifications(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(scope): Query<dto::DepartmentScope>,
) -> axum::response::Response {
    errors::reply_items(
        services
            .list_classifications(&principal, scope.department_id)
            .await,
    )
}

pub async fn create_classification(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateClassification>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::CREATED,
        services.create_classification(&principal, body).await,
    )
}

pub async fn update_classification(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<ClassificationPatch>,
) -> axum::response::Response {
    let id: ClassificationId = match errors::parse_id(&id, "classification") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(
        StatusCode::OK,
        services.update_classification(&principal, id, patch).await,
    )
}

pub async fn delete_classification(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ClassificationId = match errors::parse_id(&id, "classification") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_classification(&principal, id).await)
}

pub async fn list_locations(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ClassificationId = match errors::parse_id(&id, "classification") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply_items(services.list_locations(&principal, id).await)
}

pub async fn create_location(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<NewLocation>,
) -> axum::response::Response {
    let id: ClassificationId = match errors::parse_id(&id, "classification") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(
        StatusCode::CREATED,
        services.create_location(&principal, id, body).await,
    )
}

pub async fn update_location(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<LocationPatch>,
) -> axum::response::Response {
    let id: LocationId = match errors::parse_id(&id, "location") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.update_location(&principal, id, patch).await)
}

pub async fn delete_location(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: LocationId = match errors::parse_id(&id, "location") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_location(&principal, id).await)
}

// ── items and stock ─────────────────────────────────────────────────────────

/// GET /warehouse/items?search=&classification_id=&location_id=&page=&per_page=
pub async fn list_items(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(scope): Query<dto::DepartmentScope>,
    Query(query): Query<ItemQuery>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::OK,
        services
            .list_items(&principal, scope.department_id, &query)
            .await,
    )
}

pub async fn get_item(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.get_item(&principal, id).await)
}

pub async fn create_item(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateItem>,
) -> axum::response::Response {
    errors::reply(StatusCode::CREATED, services.create_item(&principal, body).await)
}

pub async fn import_items(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ImportItems>,
) -> axum::response::Response {
    errors::reply(StatusCode::CREATED, services.import_items(&principal, body).await)
}

pub async fn update_item(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<ItemPatch>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.update_item(&principal, id, patch).await)
}

pub async fn delete_item(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_item(&principal, id).await)
}

pub async fn move_stock(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<StockMovement>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::CREATED, services.move_stock(&principal, id, body).await)
}

/// GET /warehouse/transactions?window=7&transaction_type=&department_id=&item_id=&search=
pub async fn list_transactions(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TransactionQuery>,
) -> axum::response::Response {
    errors::reply_items(services.list_transactions(&principal, &query).await)
}

// ── item requests ───────────────────────────────────────────────────────────

pub async fn list_requests(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(scope): Query<dto::DepartmentScope>,
) -> axum::response::Response {
    errors::reply_items(
        services
            .list_item_requests(&principal, scope.department_id)
            .await,
    )
}

pub async fn record_request(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateItemRequest>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::CREATED,
        services.record_item_request(&principal, body).await,
    )
}

pub async fn get_request(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemRequestId = match errors::parse_id(&id, "item request") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.get_item_request(&principal, id).await)
}

pub async fn delete_request(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemRequestId = match errors::parse_id(&id, "item request") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::no_content(services.delete_item_request(&principal, id).await)
}

// ── approvers ───────────────────────────────────────────────────────────────

pub async fn list_approvers(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<dto::ApproverFilter>,
) -> axum::response::Response {
    errors::reply_items(
        services
            .list_approvers(&principal, filter.include_inactive)
            .await,
    )
}

pub async fn create_approver(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewApprover>,
) -> axum::response::Response {
    errors::reply(StatusCode::CREATED, services.create_approver(&principal, body).await)
}

pub async fn update_approver(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<ApproverPatch>,
) -> axum::response::Response {
    let id: ApproverId = match errors::parse_id(&id, "approver") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.update_approver(&principal, id, patch).await)
}

pub async fn deactivate_approver(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ApproverId = match errors::parse_id(&id, "approver") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.deactivate_approver(&principal, id).await)
}

// ── views ───────────────────────────────────────────────────────────────────

pub async fn inventory_stats(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(scope): Query<dto::DepartmentScope>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::OK,
        services
            .inventory_stats(&principal, scope.department_id)
            .await,
    )
}

pub async fn low_stock(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(scope): Query<dto::DepartmentScope>,
) -> axum::response::Response {
    errors::reply(
        StatusCode::OK,
        services
            .low_stock_report(&principal, scope.department_id)
            .await,
    )
}

pub async fn it_equipment(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply_items(services.it_equipment(&principal).await)
}
