//! Authentication and authorization boundary for the console.
//!
//! Roles, permissions, the resolved `Principal`, token claims and the
//! user-management policy. This crate is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthzError, RbacRegistry, authorize, authorize_in_department,
    explain_authorization,
};
pub use claims::{
    Hs256JwtValidator, JwtClaims, JwtIssuer, JwtValidator, TokenValidationError, validate_claims,
};
pub use password::{PasswordError, generate_reset_token, hash_password, validate_password_strength, verify_password};
pub use permissions::{Permission, role_permissions};
pub use policy::{ManagedUser, PolicyViolation, UserManagementPolicy};
pub use principal::{Principal, RoleAssignment};
pub use roles::AppRole;
