//! Who may administer which user accounts.

use opsconsole_core::{DepartmentId, DomainError, UserId};

use crate::{AppRole, AuthzError, Principal};

/// The target of a user-management action as currently stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedUser {
    pub user_id: UserId,
    pub role: AppRole,
    pub department_id: Option<DepartmentId>,
}

#[derive(Debug, Clone, Copy)]
pub struct UserManagementPolicy<'a> {
    actor: &'a Principal,
}

impl<'a> UserManagementPolicy<'a> {
    /// Fails unless the actor holds admin or super_admin.
    pub fn for_actor(actor: &'a Principal) -> Result<Self, AuthzError> {
        if actor.has_role(AppRole::SuperAdmin) || actor.has_role(AppRole::Admin) {
            Ok(Self { actor })
        } else {
            Err(AuthzError::policy("Only admins can manage users"))
        }
    }

    fn is_super_admin(&self) -> bool {
        self.actor.is_super_admin()
    }

    /// Department attached to the actor's administrative role row.
    pub fn admin_department(&self) -> Option<DepartmentId> {
        self.actor
            .roles
            .iter()
            .find(|r| r.role.is_administrative())
            .and_then(|r| r.department_id)
    }

    /// Admins only reach non-admin users of their own department.
    pub fn ensure_can_manage(&self, target: &ManagedUser) -> Result<(), AuthzError> {
        if self.is_super_admin() {
            return Ok(());
        }
        if target.department_id.is_none() || target.department_id != self.admin_department() {
            return Err(AuthzError::policy("You can only manage users in your department"));
        }
        if target.role.is_administrative() {
            return Err(AuthzError::policy("You cannot manage admin or super_admin users"));
        }
        Ok(())
    }

    pub fn ensure_can_assign_role(&self, role: AppRole) -> Result<(), AuthzError> {
        if self.is_super_admin() || !role.is_administrative() {
            Ok(())
        } else {
            Err(AuthzError::policy("You cannot assign admin or super_admin roles"))
        }
    }

    pub fn ensure_can_assign_department(
        &self,
        department: Option<DepartmentId>,
    ) -> Result<(), AuthzError> {
        if self.is_super_admin() || department.is_none() || department == self.admin_department() {
            Ok(())
        } else {
            Err(AuthzError::policy("You can only assign users to your department"))
        }
    }

    /// Creating an account is an assignment of role and department.
    pub fn ensure_can_create(
        &self,
        role: AppRole,
        department: Option<DepartmentId>,
    ) -> Result<(), AuthzError> {
        self.ensure_can_assign_role(role)?;
        self.ensure_can_assign_department(department)
    }

    /// Self-deletion is a validation failure rather than a permission one.
    pub fn ensure_can_delete(&self, target: &ManagedUser) -> Result<(), PolicyViolation> {
        if target.user_id == self.actor.user_id {
            return Err(PolicyViolation::Domain(DomainError::validation(
                "You cannot delete your own account",
            )));
        }
        self.ensure_can_manage(target).map_err(PolicyViolation::Authz)
    }

    pub fn ensure_can_manage_department_access(&self) -> Result<(), AuthzError> {
        if self.is_super_admin() {
            Ok(())
        } else {
            Err(AuthzError::policy("Only super admins can change department access"))
        }
    }

    /// Admin password resets (initiate and direct set) are super_admin only.
    pub fn ensure_can_reset_passwords(&self) -> Result<(), AuthzError> {
        if self.is_super_admin() {
            Ok(())
        } else {
            Err(AuthzError::policy("Only super admins can reset passwords"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoleAssignment;

    fn actor(role: AppRole, dept: Option<DepartmentId>) -> Principal {
        Principal::new(UserId::new(), "admin@ops.test", vec![RoleAssignment::new(role, dept)])
    }

    fn target(role: AppRole, dept: Option<DepartmentId>) -> ManagedUser {
        ManagedUser {
            user_id: UserId::new(),
            role,
            department_id: dept,
        }
    }

    #[test]
    fn managers_are_not_user_admins() {
        let a = actor(AppRole::Director, Some(DepartmentId::new()));
        assert!(UserManagementPolicy::for_actor(&a).is_err());
    }

    #[test]
    fn admin_is_confined_to_own_department() {
        let dept = DepartmentId::new();
        let a = actor(AppRole::Admin, Some(dept));
        let policy = UserManagementPolicy::for_actor(&a).unwrap();

        assert!(policy.ensure_can_manage(&target(AppRole::Manager, Some(dept))).is_ok());
        assert!(policy.ensure_can_manage(&target(AppRole::Staff, Some(DepartmentId::new()))).is_err());
        assert!(policy.ensure_can_manage(&target(AppRole::Staff, None)).is_err());
        assert!(policy.ensure_can_manage(&target(AppRole::Admin, Some(dept))).is_err());
    }

    #[test]
    fn admin_cannot_escalate() {
        let dept = DepartmentId::new();
        let a = actor(AppRole::Admin, Some(dept));
        let policy = UserManagementPolicy::for_actor(&a).unwrap();

        assert!(policy.ensure_can_assign_role(AppRole::Director).is_ok());
        assert!(policy.ensure_can_assign_role(AppRole::Admin).is_err());
        assert!(policy.ensure_can_assign_department(None).is_ok());
        assert!(policy.ensure_can_assign_department(Some(dept)).is_ok());
        assert!(policy.ensure_can_assign_department(Some(DepartmentId::new())).is_err());
        assert!(policy.ensure_can_manage_department_access().is_err());
    }

    #[test]
    fn super_admin_may_do_anything_but_delete_itself() {
        let a = actor(AppRole::SuperAdmin, None);
        let policy = UserManagementPolicy::for_actor(&a).unwrap();

        assert!(policy.ensure_can_manage(&target(AppRole::Admin, None)).is_ok());
        assert!(policy.ensure_can_assign_role(AppRole::SuperAdmin).is_ok());
        assert!(policy.ensure_can_manage_department_access().is_ok());

        let me = ManagedUser {
            user_id: a.user_id,
            role: AppRole::SuperAdmin,
            department_id: None,
        };
        assert!(matches!(
            policy.ensure_can_delete(&me),
            Err(PolicyViolation::Domain(DomainError::Validation(_)))
        ));
    }
}
