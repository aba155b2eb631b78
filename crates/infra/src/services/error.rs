use thiserror::Error;

use opsconsole_auth::{AuthzError, PasswordError, PolicyViolation, TokenValidationError};
use opsconsole_core::DomainError;

use crate::blob::BlobError;
use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Everything a service call can fail with. The API maps each variant to a
/// status code in one place.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Domain(DomainError::not_found(what))
    }
}

impl From<PolicyViolation> for ServiceError {
    fn from(value: PolicyViolation) -> Self {
        match value {
            PolicyViolation::Authz(e) => Self::Authz(e),
            PolicyViolation::Domain(e) => Self::Domain(e),
        }
    }
}

impl From<TokenValidationError> for ServiceError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Signing(msg) => Self::Internal(msg),
            other => Self::Unauthenticated(other.to_string()),
        }
    }
}
