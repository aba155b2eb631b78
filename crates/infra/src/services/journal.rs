//! Side effects shared by every mutation: the change event for realtime
//! subscribers, the audit row, and user notifications.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use opsconsole_auth::{AppRole, Principal};
use opsconsole_core::{DepartmentId, UserId};
use opsconsole_events::{ChangeAction, ChangeEvent};
use opsconsole_monitoring::{AuditAction, AuditLog};
use opsconsole_notifications::{NewNotification, Notification};

use super::{ServiceResult, Services, actor};
use crate::store::Record;

/// One audited mutation.
#[derive(Debug, Clone)]
pub(crate) struct Change {
    table: &'static str,
    record_id: Uuid,
    department_id: Option<DepartmentId>,
    action: AuditAction,
    old: Option<serde_json::Value>,
    new: Option<serde_json::Value>,
}

fn snapshot<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

impl Change {
    fn of<E: Record>(action: AuditAction, record: &E) -> Self {
        Self {
            table: E::KIND,
            record_id: record.id().into(),
            department_id: record.department_id(),
            action,
            old: None,
            new: None,
        }
    }

    pub(crate) fn insert<E: Record>(after: &E) -> Self {
        Self {
            new: snapshot(after),
            ..Self::of(AuditAction::Insert, after)
        }
    }

    pub(crate) fn update<E: Record>(before: &E, after: &E) -> Self {
        Self {
            old: snapshot(before),
            new: snapshot(after),
            ..Self::of(AuditAction::Update, after)
        }
    }

    pub(crate) fn delete<E: Record>(before: &E) -> Self {
        Self {
            old: snapshot(before),
            ..Self::of(AuditAction::Delete, before)
        }
    }

    pub(crate) fn with_action(mut self, action: AuditAction) -> Self {
        self.action = action;
        self
    }

    /// Drop a field from both snapshots (credentials, tokens).
    pub(crate) fn redact(mut self, field: &str) -> Self {
        for data in [self.old.as_mut(), self.new.as_mut()].into_iter().flatten() {
            if let Some(obj) = data.as_object_mut() {
                obj.remove(field);
            }
        }
        self
    }

    fn change_action(&self) -> ChangeAction {
        match self.action {
            AuditAction::Insert => ChangeAction::Insert,
            AuditAction::Delete => ChangeAction::Delete,
            AuditAction::Update | AuditAction::PasswordReset => ChangeAction::Update,
        }
    }
}

impl Services {
    /// Publish the change and append the audit row.
    pub(crate) async fn journal(&self, principal: &Principal, change: Change) {
        let now = Utc::now();
        self.bus.publish(
            ChangeEvent::new(change.table, change.change_action(), change.record_id, now)
                .in_department(change.department_id)
                .with_payload(change.new.clone().unwrap_or(serde_json::Value::Null)),
        );

        let mut log = AuditLog::record(
            &actor(principal),
            change.action,
            change.table,
            change.record_id,
            now,
        )
        .in_department(change.department_id);
        if let Some(old) = change.old {
            log = log.with_old(old);
        }
        if let Some(new) = change.new {
            log = log.with_new(new);
        }
        if let Err(e) = self.stores.audit_logs.insert(log).await {
            tracing::warn!(table = change.table, error = %e, "audit append failed");
        }
    }

    /// Realtime-only publication (no audit row), for high-churn records such
    /// as sessions.
    pub(crate) fn publish<E: Record>(&self, record: &E, action: ChangeAction) {
        let mut event = ChangeEvent::for_entity(record, action, Utc::now());
        if let Some(payload) = snapshot(record) {
            event = event.with_payload(payload);
        }
        self.bus.publish(event);
    }

    /// Store one notification per distinct recipient and push each to its
    /// owner only.
    pub(crate) async fn notify(
        &self,
        recipients: impl IntoIterator<Item = UserId>,
        note: NewNotification,
    ) -> Vec<Notification> {
        let now = Utc::now();
        let rows = match note.fan_out(recipients, now) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "notification rejected");
                return Vec::new();
            }
        };

        let mut sent = Vec::with_capacity(rows.len());
        for n in rows {
            match self.stores.notifications.insert(n.clone()).await {
                Ok(()) => {
                    let mut event = ChangeEvent::for_entity(&n, ChangeAction::Insert, now)
                        .for_user(n.user_id);
                    if let Some(payload) = snapshot(&n) {
                        event = event.with_payload(payload);
                    }
                    self.bus.publish(event);
                    sent.push(n);
                }
                Err(e) => {
                    tracing::warn!(user_id = %n.user_id, error = %e, "notification insert failed")
                }
            }
        }
        sent
    }

    /// Users working in the department (role row or explicit grant) whose
    /// role is at least `min_role`.
    pub(crate) async fn department_members(
        &self,
        department: DepartmentId,
        min_role: AppRole,
    ) -> ServiceResult<Vec<UserId>> {
        let grants = self.stores.department_access.list().await?;
        let granted: Vec<UserId> = grants
            .iter()
            .filter(|g| g.department_id == department)
            .map(|g| g.user_id)
            .collect();

        let mut members: Vec<UserId> = self
            .stores
            .user_roles
            .list()
            .await?
            .into_iter()
            .filter(|r| r.role >= min_role)
            .filter(|r| r.department_id == Some(department) || granted.contains(&r.user_id))
            .map(|r| r.user_id)
            .collect();
        members.sort();
        members.dedup();
        Ok(members)
    }
}
