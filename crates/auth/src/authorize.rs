use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use opsconsole_core::{DepartmentId, UserId};

use crate::permissions::permission_description;
use crate::{AppRole, Permission, Principal, role_permissions};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: no access to department {0}")]
    DepartmentDenied(DepartmentId),

    #[error("forbidden: {0}")]
    Policy(String),
}

impl AuthzError {
    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }
}

/// Check a permission against the principal's roles.
///
/// Pure policy check: no IO, no panics.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.has_permission(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Check a permission and that the principal can reach the department.
pub fn authorize_in_department(
    principal: &Principal,
    required: &Permission,
    department: DepartmentId,
) -> Result<(), AuthzError> {
    authorize(principal, required)?;
    if principal.can_access_department(department) {
        Ok(())
    } else {
        Err(AuthzError::DepartmentDenied(department))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub department_id: Option<DepartmentId>,
    pub granted: bool,
    pub reason: String,
    pub principal: PrincipalState,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub user_id: UserId,
    pub highest_role: AppRole,
    pub roles: Vec<String>,
    pub departments: Vec<DepartmentId>,
    pub effective_permissions: Vec<String>,
    pub has_wildcard: bool,
}

/// Explain why a request would be allowed or denied.
///
/// When `department` is given the department gate is evaluated as well.
pub fn explain_authorization(
    principal: &Principal,
    required: &Permission,
    department: Option<DepartmentId>,
) -> AuthorizationExplanation {
    let effective: Vec<String> = principal
        .permissions()
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();
    let has_wildcard = effective.iter().any(|p| p == "*");

    let state = PrincipalState {
        user_id: principal.user_id,
        highest_role: principal.highest_role(),
        roles: principal
            .roles
            .iter()
            .map(|r| r.role.as_str().to_string())
            .collect(),
        departments: principal.accessible_departments().into_iter().collect(),
        effective_permissions: effective,
        has_wildcard,
    };

    let required_str = required.as_str().to_string();

    if !principal.has_permission(required) {
        let mut suggestions = Vec::new();
        if let Some(role) = AppRole::ALL
            .into_iter()
            .find(|r| role_permissions(*r).iter().any(|p| p == required || p.is_wildcard()))
        {
            suggestions.push(format!(
                "Assign the '{role}' role (or higher), the lowest rank granting '{required_str}'"
            ));
        }
        return AuthorizationExplanation {
            reason: format!(
                "Role '{}' does not grant permission '{required_str}'",
                state.highest_role
            ),
            required_permission: required_str,
            department_id: department,
            granted: false,
            principal: state,
            suggestions,
        };
    }

    if let Some(dept) = department {
        if !principal.can_access_department(dept) {
            return AuthorizationExplanation {
                required_permission: required_str,
                department_id: department,
                granted: false,
                reason: format!("Principal is not a member of department {dept}"),
                principal: state,
                suggestions: vec![
                    "Grant the user access to the department".to_string(),
                    "Move the user's role to the department".to_string(),
                ],
            };
        }
    }

    let reason = if has_wildcard {
        "Principal has wildcard permission '*' (super_admin)".to_string()
    } else {
        format!("Role '{}' grants '{required_str}'", state.highest_role)
    };

    AuthorizationExplanation {
        required_permission: required_str,
        department_id: department,
        granted: true,
        reason,
        principal: state,
        suggestions: Vec::new(),
    }
}

/// Role definition with its granted permissions (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: String,
    pub rank: usize,
    pub permissions: Vec<String>,
    pub description: String,
}

/// Permission definition (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDefinition {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
}

/// Catalogue of every role and permission known to the console.
#[derive(Debug, Clone, Serialize)]
pub struct RbacRegistry {
    pub roles: BTreeMap<String, RoleDefinition>,
    pub permissions: BTreeMap<String, PermissionDefinition>,
}

impl RbacRegistry {
    pub fn build() -> Self {
        let mut roles = BTreeMap::new();
        let mut permissions = BTreeMap::new();

        for (rank, role) in AppRole::ALL.into_iter().enumerate() {
            let perms = role_permissions(role);
            for perm in &perms {
                permissions
                    .entry(perm.as_str().to_string())
                    .or_insert_with(|| PermissionDefinition {
                        name: perm.as_str().to_string(),
                        description: permission_description(perm.as_str()),
                        category: perm
                            .as_str()
                            .split('.')
                            .next()
                            .filter(|c| *c != "*")
                            .unwrap_or("system")
                            .to_string(),
                    });
            }
            roles.insert(
                role.as_str().to_string(),
                RoleDefinition {
                    name: role.as_str().to_string(),
                    rank,
                    permissions: perms.iter().map(|p| p.as_str().to_string()).collect(),
                    description: role.description().to_string(),
                },
            );
        }

        Self { roles, permissions }
    }
}
