use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use opsconsole_auth::Principal;
use opsconsole_infra::{Bucket, Services};

use crate::app::errors;

fn bucket(raw: &str) -> Result<Bucket, axum::response::Response> {
    raw.parse()
        .map_err(|e: opsconsole_infra::BlobError| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_path", e.to_string())
        })
}

/// POST /storage/:bucket/*path with the raw file as the body.
pub async fn upload(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<Principal>,
    Path((bucket_name, path)): Path<(String, String)>,
    body: Bytes,
) -> axum::response::Response {
    let bucket = match bucket(&bucket_name) {
        Ok(b) => b,
        Err(r) => return r,
    };
    match services.upload(&principal, bucket, &path, body.to_vec()).await {
        Ok(url) => (StatusCode::CREATED, Json(json!({ "url": url }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /storage/:bucket/*path (public)
pub async fn download(
    Extension(services): Extension<Arc<Services>>,
    Path((bucket_name, path)): Path<(String, String)>,
) -> axum::response::Response {
    let bucket = match bucket(&bucket_name) {
        Ok(b) => b,
        Err(r) => return r,
    };
    match services.download(bucket, &path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type(&path))],
            bytes,
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn content_type(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
