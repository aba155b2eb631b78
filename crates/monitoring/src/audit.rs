use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsconsole_core::{AuditLogId, DepartmentId, Entity, UserId};

pub const AUDIT_LIMIT: usize = 500;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Insert,
    Update,
    Delete,
    PasswordReset,
}

/// Who performed a change, captured by value so the log survives user deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub user_email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub user_email: String,
    pub action: AuditAction,
    pub table_name: String,
    pub record_id: Uuid,
    pub old_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
    pub department_id: Option<DepartmentId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for AuditLog {
    type Id = AuditLogId;
    const KIND: &'static str = "audit_logs";

    fn id(&self) -> AuditLogId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        self.department_id
    }
}

impl AuditLog {
    pub fn record(
        actor: &Actor,
        action: AuditAction,
        table_name: &str,
        record_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            user_id: actor.user_id,
            user_name: actor.user_name.clone(),
            user_email: actor.user_email.clone(),
            action,
            table_name: table_name.to_string(),
            record_id,
            old_data: None,
            new_data: None,
            department_id: None,
            created_at: now,
        }
    }

    pub fn with_old(mut self, data: serde_json::Value) -> Self {
        self.old_data = Some(data);
        self
    }

    pub fn with_new(mut self, data: serde_json::Value) -> Self {
        self.new_data = Some(data);
        self
    }

    pub fn in_department(mut self, department_id: Option<DepartmentId>) -> Self {
        self.department_id = department_id;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub action: Option<AuditAction>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Newest first, never more than [`AUDIT_LIMIT`] rows.
    pub fn apply(&self, logs: Vec<AuditLog>) -> Vec<AuditLog> {
        let mut out: Vec<AuditLog> = logs
            .into_iter()
            .filter(|l| self.table_name.as_deref().is_none_or(|t| t == l.table_name))
            .filter(|l| self.action.is_none_or(|a| a == l.action))
            .filter(|l| self.user_id.is_none_or(|u| u == l.user_id))
            .filter(|l| self.since.is_none_or(|s| l.created_at >= s))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(self.limit.unwrap_or(AUDIT_LIMIT).min(AUDIT_LIMIT));
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn actor() -> Actor {
        Actor {
            user_id: UserId::new(),
            user_name: Some("Dana Ops".into()),
            user_email: "dana@example.com".into(),
        }
    }

    #[test]
    fn actions_serialize_upper_case() {
        let json = serde_json::to_string(&AuditAction::PasswordReset).unwrap();
        assert_eq!(json, "\"PASSWORD_RESET\"");
    }

    #[test]
    fn query_filters_and_caps() {
        let who = actor();
        let base = Utc::now();
        let mut logs: Vec<AuditLog> = (0..600)
            .map(|i| {
                AuditLog::record(&who, AuditAction::Update, "fleets", Uuid::nil(), base + Duration::seconds(i))
            })
            .collect();
        logs.push(AuditLog::record(&who, AuditAction::Delete, "inventory_items", Uuid::nil(), base));

        let all = AuditQuery::default().apply(logs.clone());
        assert_eq!(all.len(), AUDIT_LIMIT);
        assert!(all[0].created_at >= all[1].created_at);

        let q = AuditQuery { action: Some(AuditAction::Delete), ..Default::default() };
        assert_eq!(q.apply(logs.clone())[0].table_name, "inventory_items");

        let q = AuditQuery { table_name: Some("fleets".into()), limit: Some(10), ..Default::default() };
        assert_eq!(q.apply(logs).len(), 10);
    }
}
