use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{DepartmentId, Entity, FleetAuditId, FleetId, UserId};

/// One field that moved during an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetAuditEntry {
    pub id: FleetAuditId,
    pub fleet_id: FleetId,
    pub department_id: DepartmentId,
    pub user_id: UserId,
    pub action: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for FleetAuditEntry {
    type Id = FleetAuditId;
    const KIND: &'static str = "fleet_audit_log";

    fn id(&self) -> FleetAuditId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

impl FleetAuditEntry {
    pub fn record(
        fleet_id: FleetId,
        department_id: DepartmentId,
        user_id: UserId,
        action: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: FleetAuditId::new(),
            fleet_id,
            department_id,
            user_id,
            action: action.to_string(),
            field_name: None,
            old_value: None,
            new_value: None,
            created_at: now,
        }
    }

    /// One `updated` entry per changed field.
    pub fn from_changes(
        fleet_id: FleetId,
        department_id: DepartmentId,
        user_id: UserId,
        changes: &[FieldChange],
        now: DateTime<Utc>,
    ) -> Vec<Self> {
        changes
            .iter()
            .map(|c| Self {
                field_name: Some(c.field.to_string()),
                old_value: c.old.clone(),
                new_value: c.new.clone(),
                ..Self::record(fleet_id, department_id, user_id, "updated", now)
            })
            .collect()
    }
}
