use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use opsconsole_core::{DepartmentId, UserId};

use crate::{AppRole, Permission, role_permissions};

/// A role held by a user, optionally scoped to a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: AppRole,
    pub department_id: Option<DepartmentId>,
}

impl RoleAssignment {
    pub fn new(role: AppRole, department_id: Option<DepartmentId>) -> Self {
        Self { role, department_id }
    }
}

/// A fully resolved principal for authorization decisions.
///
/// Built by the API layer from a verified token plus the directory's view of
/// the user (role rows and department grants). No storage access happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub roles: Vec<RoleAssignment>,
    pub granted_departments: Vec<DepartmentId>,
}

impl Principal {
    pub fn new(user_id: UserId, email: impl Into<String>, roles: Vec<RoleAssignment>) -> Self {
        Self {
            user_id,
            email: email.into(),
            full_name: None,
            roles,
            granted_departments: Vec::new(),
        }
    }

    pub fn with_full_name(mut self, name: Option<String>) -> Self {
        self.full_name = name;
        self
    }

    pub fn with_granted_departments(mut self, departments: Vec<DepartmentId>) -> Self {
        self.granted_departments = departments;
        self
    }

    /// Highest held role; a user without role rows is treated as staff.
    pub fn highest_role(&self) -> AppRole {
        self.roles
            .iter()
            .map(|r| r.role)
            .max()
            .unwrap_or(AppRole::Staff)
    }

    pub fn has_role(&self, role: AppRole) -> bool {
        self.roles.iter().any(|r| r.role == role)
    }

    pub fn has_min_role(&self, role: AppRole) -> bool {
        self.highest_role() >= role
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(AppRole::SuperAdmin)
    }

    /// Department of the first role row carrying one.
    pub fn primary_department(&self) -> Option<DepartmentId> {
        self.roles.iter().find_map(|r| r.department_id)
    }

    /// Member of the department through a role row or an explicit grant.
    pub fn is_in_department(&self, department: DepartmentId) -> bool {
        self.roles.iter().any(|r| r.department_id == Some(department))
            || self.granted_departments.contains(&department)
    }

    pub fn can_access_department(&self, department: DepartmentId) -> bool {
        self.is_super_admin() || self.is_in_department(department)
    }

    /// Every department reachable without the super_admin bypass.
    pub fn accessible_departments(&self) -> BTreeSet<DepartmentId> {
        self.roles
            .iter()
            .filter_map(|r| r.department_id)
            .chain(self.granted_departments.iter().copied())
            .collect()
    }

    /// Union of the permissions granted by every held role.
    pub fn permissions(&self) -> BTreeSet<Permission> {
        let mut perms: BTreeSet<Permission> = self
            .roles
            .iter()
            .flat_map(|r| role_permissions(r.role))
            .collect();
        if perms.is_empty() {
            perms.extend(role_permissions(AppRole::Staff));
        }
        perms
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions()
            .iter()
            .any(|p| p.is_wildcard() || p == permission)
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{USERS_MANAGE, WAREHOUSE_READ, WAREHOUSE_WRITE};

    #[test]
    fn staff_default_without_role_rows() {
        let p = Principal::new(UserId::new(), "a@b.c", vec![]);
        assert_eq!(p.highest_role(), AppRole::Staff);
        assert!(p.has_permission(&WAREHOUSE_READ));
        assert!(!p.has_permission(&WAREHOUSE_WRITE));
    }

    #[test]
    fn grants_extend_department_membership() {
        let own = DepartmentId::new();
        let granted = DepartmentId::new();
        let other = DepartmentId::new();
        let p = Principal::new(
            UserId::new(),
            "a@b.c",
            vec![RoleAssignment::new(AppRole::Manager, Some(own))],
        )
        .with_granted_departments(vec![granted]);

        assert!(p.can_access_department(own));
        assert!(p.can_access_department(granted));
        assert!(!p.can_access_department(other));
        assert_eq!(p.primary_department(), Some(own));
    }

    #[test]
    fn super_admin_reaches_every_department() {
        let p = Principal::new(
            UserId::new(),
            "root@ops",
            vec![RoleAssignment::new(AppRole::SuperAdmin, None)],
        );
        assert!(p.can_access_department(DepartmentId::new()));
        assert!(p.has_permission(&USERS_MANAGE));
    }
}
