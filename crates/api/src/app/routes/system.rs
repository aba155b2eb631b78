use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use opsconsole_auth::Principal;
use opsconsole_events::ChangeFilter;
use opsconsole_infra::Services;

use crate::app::dto;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id.to_string(),
        "email": principal.email,
        "full_name": principal.full_name,
        "highest_role": principal.highest_role(),
        "roles": principal.roles,
        "departments": principal.accessible_departments(),
        "permissions": principal
            .permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect::<Vec<_>>(),
    }))
}

/// GET /stream
///
/// Server-sent change feed. Each event is a coarse invalidation signal
/// (`table`, `action`, `record_id`) filtered to what the caller may see.
/// Slow consumers skip missed events rather than slowing publishers down.
pub async fn stream(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<dto::StreamQuery>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let user_id = principal.user_id;
    let filter = ChangeFilter::new(principal).with_tables(query.tables());

    let stream = BroadcastStream::new(services.bus().subscribe()).filter_map(move |msg| match msg {
        Ok(event) if filter.allows(&event) => match serde_json::to_string(&event) {
            Ok(data) => Some(Ok(SseEvent::default().event("change").data(data))),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode change event");
                None
            }
        },
        Ok(_) => None,
        Err(lagged) => {
            tracing::warn!(%user_id, error = %lagged, "change stream subscriber lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
