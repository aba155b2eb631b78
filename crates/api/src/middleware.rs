use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use opsconsole_auth::JwtValidator;
use opsconsole_infra::Services;

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub services: Arc<Services>,
}

/// Verifies the bearer token and stores the caller's `Principal`, freshly
/// resolved from the directory, in the request extensions. Tokens revoked by
/// a password reset or change are refused here too.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token.to_string(),
        Err(msg) => return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", msg),
    };

    let claims = match state.jwt.validate(&token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string());
        }
    };

    let principal = match state.services.authenticate(&claims).await {
        Ok(principal) => principal,
        Err(e) => return errors::service_error_to_response(e),
    };

    req.extensions_mut().insert(principal);
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("missing Authorization header")?;

    let header = header.to_str().map_err(|_| "malformed Authorization header")?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or("expected a Bearer token")?
        .trim();
    if token.is_empty() {
        return Err("expected a Bearer token");
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer(&headers).is_err());

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer(&headers).is_err());

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert!(extract_bearer(&headers).is_err());

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_bearer(&headers).unwrap(), "tok");
    }
}
