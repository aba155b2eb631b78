use core::str::FromStr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use opsconsole_auth::PasswordError;
use opsconsole_core::DomainError;
use opsconsole_infra::{BlobError, ServiceError, ServiceResult, StoreError};

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Authz(e) => json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
        ServiceError::Unauthenticated(msg) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", msg)
        }
        ServiceError::Password(PasswordError::Hashing(msg)) => {
            tracing::error!(error = %msg, "password hashing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "password hashing failed")
        }
        ServiceError::Password(e) => json_error(StatusCode::BAD_REQUEST, "weak_password", e.to_string()),
        ServiceError::Store(e @ StoreError::NotFound { .. }) => {
            json_error(StatusCode::NOT_FOUND, "not_found", e.to_string())
        }
        ServiceError::Store(e @ StoreError::Conflict { .. }) => {
            json_error(StatusCode::CONFLICT, "conflict", e.to_string())
        }
        ServiceError::Store(e @ StoreError::Stale { .. }) => {
            json_error(StatusCode::CONFLICT, "stale_write", e.to_string())
        }
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        ServiceError::Blob(e @ BlobError::NotFound { .. }) => {
            json_error(StatusCode::NOT_FOUND, "not_found", e.to_string())
        }
        ServiceError::Blob(e @ BlobError::AlreadyExists { .. }) => {
            json_error(StatusCode::CONFLICT, "conflict", e.to_string())
        }
        ServiceError::Blob(e @ (BlobError::UnknownBucket(_) | BlobError::InvalidPath(_))) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_path", e.to_string())
        }
        ServiceError::Blob(e @ BlobError::Io(_)) => {
            tracing::error!(error = %e, "blob storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", e.to_string())
        }
        ServiceError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path identifier, answering 400 `invalid_id` on failure.
pub fn parse_id<T>(raw: &str, what: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

/// Serialize a service result with `status`, or map the error.
pub fn reply<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

/// Lists are wrapped as `{"items": [...]}`.
pub fn reply_items<T: Serialize>(result: ServiceResult<Vec<T>>) -> Response {
    match result {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub fn no_content(result: ServiceResult<()>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => service_error_to_response(e),
    }
}

#[cfg(test)]
mod tests {
    use opsconsole_auth::AuthzError;
    use opsconsole_core::FleetId;
    use opsconsole_infra::Bucket;

    use super::*;

    #[test]
    fn maps_errors_to_statuses() {
        let cases = [
            (ServiceError::from(DomainError::validation("x")), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("x").into(), StatusCode::BAD_REQUEST),
            (ServiceError::unauthenticated("x"), StatusCode::UNAUTHORIZED),
            (AuthzError::policy("x").into(), StatusCode::FORBIDDEN),
            (ServiceError::not_found("fleet"), StatusCode::NOT_FOUND),
            (DomainError::conflict("x").into(), StatusCode::CONFLICT),
            (DomainError::invariant("x").into(), StatusCode::UNPROCESSABLE_ENTITY),
            (StoreError::Backend("down".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
            (
                StoreError::Conflict { kind: "fleets", id: "1".into() }.into(),
                StatusCode::CONFLICT,
            ),
            (
                StoreError::Stale { kind: "inventory_items", id: "1".into(), expected: 2, actual: 3 }
                    .into(),
                StatusCode::CONFLICT,
            ),
            (PasswordError::TooShort.into(), StatusCode::BAD_REQUEST),
            (BlobError::InvalidPath("../x".into()).into(), StatusCode::BAD_REQUEST),
            (
                BlobError::AlreadyExists { bucket: Bucket::ItemImages, path: "a.png".into() }.into(),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn parse_id_rejects_garbage() {
        let res = parse_id::<FleetId>("nope", "fleet").unwrap_err();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(parse_id::<FleetId>(&FleetId::new().to_string(), "fleet").is_ok());
    }
}
