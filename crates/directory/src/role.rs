use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_auth::{AppRole, RoleAssignment};
use opsconsole_core::{DepartmentId, Entity, RoleAssignmentId, UserId};

/// Stored role row. Each user has exactly one, updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: RoleAssignmentId,
    pub user_id: UserId,
    pub role: AppRole,
    pub department_id: Option<DepartmentId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for UserRole {
    type Id = RoleAssignmentId;
    const KIND: &'static str = "user_roles";

    fn id(&self) -> RoleAssignmentId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        self.department_id
    }
}

impl UserRole {
    pub fn new(
        user_id: UserId,
        role: AppRole,
        department_id: Option<DepartmentId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RoleAssignmentId::new(),
            user_id,
            role,
            department_id,
            created_at: now,
        }
    }

    pub fn assignment(&self) -> RoleAssignment {
        RoleAssignment::new(self.role, self.department_id)
    }
}
