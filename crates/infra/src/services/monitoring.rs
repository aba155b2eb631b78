//! Audit trail queries, presence heartbeats, system events and the health
//! snapshot.

use chrono::Utc;

use opsconsole_auth::{AuthzError, Principal, authorize, permissions::AUDIT_READ};
use opsconsole_core::SystemEventId;
use opsconsole_events::ChangeAction;
use opsconsole_monitoring::{
    AuditLog, AuditQuery, EVENT_LIMIT, Heartbeat, NewSystemEvent, SystemEvent, SystemMetrics,
    SystemReport, UserSession, compute_metrics, recent_events, sweep_idle,
};

use super::{Change, ServiceResult, Services};

fn ensure_super_admin(principal: &Principal) -> ServiceResult<()> {
    if principal.is_super_admin() {
        Ok(())
    } else {
        Err(AuthzError::policy("Only super admins can view system monitoring").into())
    }
}

impl Services {
    /// Audit rows of the caller's departments (all rows for super_admin).
    pub async fn list_audit_logs(&self, principal: &Principal, query: &AuditQuery) -> ServiceResult<Vec<AuditLog>> {
        authorize(principal, &AUDIT_READ)?;
        Ok(query.apply(self.scoped(&self.stores.audit_logs, principal).await?))
    }

    // ── sessions ───────────────────────────────────────────────────────────

    pub async fn heartbeat(&self, principal: &Principal, beat: Heartbeat) -> ServiceResult<UserSession> {
        let existing = self.stores.sessions.get(UserSession::key(principal.user_id)).await?;
        let session = UserSession::heartbeat(existing, principal.user_id, beat, Utc::now());
        self.stores.sessions.upsert(session.clone()).await?;
        self.publish(&session, ChangeAction::Update);
        Ok(session)
    }

    pub async fn end_session(&self, principal: &Principal) -> ServiceResult<()> {
        if let Some(mut session) = self.stores.sessions.get(UserSession::key(principal.user_id)).await? {
            session.end();
            self.stores.sessions.update(session.clone()).await?;
            self.publish(&session, ChangeAction::Update);
        }
        Ok(())
    }

    /// Mark sessions idle past the configured threshold inactive.
    pub async fn sweep_sessions(&self) -> ServiceResult<usize> {
        let stale = sweep_idle(
            self.stores.sessions.list().await?,
            Utc::now(),
            self.config.session_idle,
        );
        for session in &stale {
            self.stores.sessions.update(session.clone()).await?;
            self.publish(session, ChangeAction::Update);
        }
        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "idle sessions swept");
        }
        Ok(stale.len())
    }

    pub async fn list_sessions(&self, principal: &Principal) -> ServiceResult<Vec<UserSession>> {
        ensure_super_admin(principal)?;
        self.sweep_sessions().await?;
        let mut sessions = self.stores.sessions.list().await?;
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(sessions)
    }

    // ── system events ──────────────────────────────────────────────────────

    /// Any signed-in user (or client) may report an event; it is attributed
    /// to them.
    pub async fn record_system_event(
        &self,
        principal: &Principal,
        input: NewSystemEvent,
    ) -> ServiceResult<SystemEvent> {
        let event = SystemEvent::record(input, Some(principal.user_id), Utc::now())?;
        self.stores.system_events.insert(event.clone()).await?;
        self.journal(principal, Change::insert(&event)).await;
        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            severity = ?event.severity,
            "system event recorded"
        );
        Ok(event)
    }

    pub async fn list_system_events(&self, principal: &Principal) -> ServiceResult<Vec<SystemEvent>> {
        ensure_super_admin(principal)?;
        Ok(recent_events(self.stores.system_events.list().await?, EVENT_LIMIT))
    }

    pub async fn resolve_system_event(
        &self,
        principal: &Principal,
        id: SystemEventId,
    ) -> ServiceResult<SystemEvent> {
        ensure_super_admin(principal)?;
        let before = self.stores.system_events.require(id).await?;
        let mut event = before.clone();
        event.resolve(Utc::now())?;
        self.stores.system_events.update(event.clone()).await?;
        self.journal(principal, Change::update(&before, &event)).await;
        Ok(event)
    }

    // ── metrics ────────────────────────────────────────────────────────────

    /// Sweeps idle sessions first so the counts are current.
    pub async fn system_metrics(&self, principal: &Principal) -> ServiceResult<SystemMetrics> {
        ensure_super_admin(principal)?;
        self.sweep_sessions().await?;
        let sessions = self.stores.sessions.list().await?;
        let total_users = self.stores.accounts.list().await?.len();
        let events = self.stores.system_events.list().await?;
        let audit = self.stores.audit_logs.list().await?;
        let last_report_at = self
            .stores
            .system_reports
            .list()
            .await?
            .into_iter()
            .map(|r| r.created_at)
            .max();
        Ok(compute_metrics(
            &sessions,
            total_users,
            events,
            &audit,
            last_report_at,
            Utc::now(),
        ))
    }

    pub async fn generate_system_report(&self, principal: &Principal) -> ServiceResult<SystemReport> {
        let metrics = self.system_metrics(principal).await?;
        let report = SystemReport::snapshot(metrics, principal.user_id);
        self.stores.system_reports.insert(report.clone()).await?;
        self.journal(principal, Change::insert(&report)).await;
        tracing::info!(report_id = %report.id, health = ?report.metrics.system_health.status, "system report generated");
        Ok(report)
    }

    pub async fn list_system_reports(&self, principal: &Principal) -> ServiceResult<Vec<SystemReport>> {
        ensure_super_admin(principal)?;
        let mut reports = self.stores.system_reports.list().await?;
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use opsconsole_auth::AppRole;
    use opsconsole_monitoring::{AuditAction, HealthStatus, Severity};

    use super::*;
    use crate::services::{ServiceConfig, ServiceError, testing};

    #[tokio::test]
    async fn audit_rows_follow_department_scope() {
        let services = testing::services();
        let wh = testing::department(&services, "WH").await;
        let flt = testing::department(&services, "FLT").await;
        let root = testing::user(&services, "root@ops.test", AppRole::SuperAdmin, None).await;
        let director = testing::user(&services, "d@ops.test", AppRole::Director, Some(wh.id)).await;
        let staff = testing::user(&services, "s@ops.test", AppRole::Staff, Some(wh.id)).await;

        services
            .update_department(&root, flt.id, Default::default())
            .await
            .unwrap();
        services
            .update_department(&root, wh.id, Default::default())
            .await
            .unwrap();

        assert!(matches!(
            services.list_audit_logs(&staff, &AuditQuery::default()).await,
            Err(ServiceError::Authz(_))
        ));
        let visible = services
            .list_audit_logs(&director, &AuditQuery::default())
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].department_id, Some(wh.id));
        assert_eq!(visible[0].action, AuditAction::Update);

        let all = services.list_audit_logs(&root, &AuditQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn idle_sessions_are_swept_before_metrics() {
        let services = testing::services().with_config(ServiceConfig {
            session_idle: Duration::zero(),
            ..Default::default()
        });
        let root = testing::user(&services, "root@ops.test", AppRole::SuperAdmin, None).await;
        let user = testing::user(&services, "u@ops.test", AppRole::Staff, None).await;

        services.heartbeat(&user, Heartbeat::default()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let metrics = services.system_metrics(&root).await.unwrap();
        assert_eq!(metrics.active_sessions, 0);
        assert_eq!(metrics.inactive_sessions, 1);
        assert_eq!(metrics.total_users, 2);

        assert!(matches!(
            services.system_metrics(&user).await,
            Err(ServiceError::Authz(_))
        ));
    }

    #[tokio::test]
    async fn unresolved_critical_event_marks_system_critical() {
        let services = testing::services();
        let root = testing::user(&services, "root@ops.test", AppRole::SuperAdmin, None).await;

        let event = services
            .record_system_event(
                &root,
                NewSystemEvent::new("database", Severity::Critical, "Replica lag above 60s"),
            )
            .await
            .unwrap();
        let report = services.generate_system_report(&root).await.unwrap();
        assert_eq!(report.metrics.system_health.status, HealthStatus::Critical);

        services.resolve_system_event(&root, event.id).await.unwrap();
        let metrics = services.system_metrics(&root).await.unwrap();
        assert_eq!(metrics.system_health.status, HealthStatus::Healthy);
        assert_eq!(metrics.last_report_at, Some(report.created_at));
    }
}
