use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use opsconsole_auth::Principal;
use opsconsole_core::TicketId;
use opsconsole_helpdesk::{NewTicket, TicketPatch, TicketQuery};
use opsconsole_infra::Services;

use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/stats", get(ticket_stats))
        .route("/:id", get(get_ticket).patch(update_ticket))
}

pub async fn list_tickets(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TicketQuery>,
) -> axum::response::Response {
    errors::reply_items(services.list_tickets(&principal, &query).await)
}

pub async fn create_ticket(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewTicket>,
) -> axum::response::Response {
    errors::reply(StatusCode::CREATED, services.create_ticket(&principal, body).await)
}

pub async fn get_ticket(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TicketId = match errors::parse_id(&id, "ticket") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.get_ticket(&principal, id).await)
}

/// PATCH /tickets/:id (service desk only)
pub async fn update_ticket(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<TicketPatch>,
) -> axum::response::Response {
    let id: TicketId = match errors::parse_id(&id, "ticket") {
        Ok(v) => v,
        Err(r) => return r,
    };
    errors::reply(StatusCode::OK, services.update_ticket(&principal, id, patch).await)
}

pub async fn ticket_stats(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    errors::reply(StatusCode::OK, services.ticket_stats(&principal).await)
}
