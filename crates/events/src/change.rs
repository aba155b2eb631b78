use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsconsole_core::{DepartmentId, Entity, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Insert => "INSERT",
            ChangeAction::Update => "UPDATE",
            ChangeAction::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row changed in one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: Uuid,
    pub table: String,
    pub action: ChangeAction,
    pub record_id: Uuid,
    pub department_id: Option<DepartmentId>,
    /// Only this user receives the event when set.
    pub audience: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl ChangeEvent {
    pub fn new(
        table: impl Into<String>,
        action: ChangeAction,
        record_id: impl Into<Uuid>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            table: table.into(),
            action,
            record_id: record_id.into(),
            department_id: None,
            audience: None,
            occurred_at,
            payload: serde_json::Value::Null,
        }
    }

    /// Event for a stored entity, scoped to the entity's department.
    pub fn for_entity<E: Entity>(entity: &E, action: ChangeAction, occurred_at: DateTime<Utc>) -> Self {
        let mut event = Self::new(E::KIND, action, entity.id(), occurred_at);
        event.department_id = entity.department_id();
        event
    }

    pub fn in_department(mut self, department: Option<DepartmentId>) -> Self {
        self.department_id = department;
        self
    }

    pub fn for_user(mut self, user: UserId) -> Self {
        self.audience = Some(user);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
