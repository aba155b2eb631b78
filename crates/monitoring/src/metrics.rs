use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{Entity, SystemReportId, UserId};

use crate::audit::{AuditAction, AuditLog};
use crate::event::{Severity, SystemEvent, recent_events};
use crate::session::UserSession;

/// Events considered for the metrics snapshot (and its health verdict).
pub const METRICS_EVENT_LIMIT: usize = 50;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

impl SystemHealth {
    pub fn assess(events: &[SystemEvent]) -> Self {
        let unresolved = |sev| {
            events
                .iter()
                .filter(|e| e.severity == sev && !e.resolved)
                .count()
        };
        let critical = unresolved(Severity::Critical);
        let high = unresolved(Severity::High);

        if critical > 0 {
            SystemHealth {
                status: HealthStatus::Critical,
                issues: vec![format!("{critical} critical unresolved issue(s)")],
            }
        } else if high > 0 {
            SystemHealth {
                status: HealthStatus::Degraded,
                issues: vec![format!("{high} high priority issue(s)")],
            }
        } else {
            SystemHealth {
                status: HealthStatus::Healthy,
                issues: Vec::new(),
            }
        }
    }
}

/// Audit volume over the trailing 24 hours.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCounts {
    pub inserts_24h: usize,
    pub updates_24h: usize,
    pub deletes_24h: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub active_sessions: usize,
    pub inactive_sessions: usize,
    pub total_users: usize,
    pub recent_events: Vec<SystemEvent>,
    pub recent_activity: ActivityCounts,
    pub system_health: SystemHealth,
    pub last_report_at: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
}

/// Build the snapshot. Callers sweep idle sessions before passing them in.
pub fn compute_metrics(
    sessions: &[UserSession],
    total_users: usize,
    events: Vec<SystemEvent>,
    audit: &[AuditLog],
    last_report_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> SystemMetrics {
    let active_sessions = sessions.iter().filter(|s| s.is_active).count();
    let since = now - Duration::hours(24);

    let mut recent_activity = ActivityCounts::default();
    for log in audit.iter().filter(|l| l.created_at >= since) {
        match log.action {
            AuditAction::Insert => recent_activity.inserts_24h += 1,
            AuditAction::Update => recent_activity.updates_24h += 1,
            AuditAction::Delete => recent_activity.deletes_24h += 1,
            AuditAction::PasswordReset => {}
        }
    }

    let recent_events = recent_events(events, METRICS_EVENT_LIMIT);
    let system_health = SystemHealth::assess(&recent_events);

    SystemMetrics {
        active_sessions,
        inactive_sessions: sessions.len() - active_sessions,
        total_users,
        recent_events,
        recent_activity,
        system_health,
        last_report_at,
        generated_at: now,
    }
}

/// Persisted metrics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemReport {
    pub id: SystemReportId,
    pub report_type: String,
    pub generated_by: UserId,
    pub metrics: SystemMetrics,
    pub created_at: DateTime<Utc>,
}

impl Entity for SystemReport {
    type Id = SystemReportId;
    const KIND: &'static str = "system_reports";

    fn id(&self) -> SystemReportId {
        self.id
    }
}

impl SystemReport {
    pub fn snapshot(metrics: SystemMetrics, generated_by: UserId) -> Self {
        Self {
            id: SystemReportId::new(),
            report_type: "system_health".to_string(),
            generated_by,
            created_at: metrics.generated_at,
            metrics,
        }
    }
}
