use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use opsconsole_infra::services::storage::MAX_UPLOAD_BYTES;

pub mod admin;
pub mod auth;
pub mod departments;
pub mod fleet;
pub mod monitoring;
pub mod notifications;
pub mod operations;
pub mod rbac;
pub mod reports;
pub mod storage;
pub mod system;
pub mod tickets;
pub mod warehouse;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/password-resets/complete", post(auth::complete_password_reset))
        .route("/storage/:bucket/*path", get(storage::download))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .nest("/profile", auth::router())
        .nest("/departments", departments::router())
        .nest("/fleet", fleet::router())
        .nest("/warehouse", warehouse::router())
        .nest("/tickets", tickets::router())
        .nest("/reports", reports::router())
        .nest("/operations", operations::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
        .nest("/monitoring", monitoring::router())
        .nest("/sessions", monitoring::sessions_router())
        .route(
            "/storage/:bucket/*path",
            // Headroom so oversized files reach the service's own size check.
            post(storage::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024)),
        )
}
