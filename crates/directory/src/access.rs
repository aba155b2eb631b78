use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{DepartmentAccessId, DepartmentId, Entity, UserId};

/// Extra department a user may work in beyond the one on their role row.
/// Unique per (user, department).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentAccess {
    pub id: DepartmentAccessId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub granted_by: UserId,
    pub granted_at: DateTime<Utc>,
}

impl Entity for DepartmentAccess {
    type Id = DepartmentAccessId;
    const KIND: &'static str = "user_department_access";

    fn id(&self) -> DepartmentAccessId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

impl DepartmentAccess {
    pub fn grant(
        user_id: UserId,
        department_id: DepartmentId,
        granted_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DepartmentAccessId::new(),
            user_id,
            department_id,
            granted_by,
            granted_at: now,
        }
    }
}
