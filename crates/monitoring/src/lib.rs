//! Audit trail, presence tracking, system events and health reporting.

pub mod audit;
pub mod event;
pub mod metrics;
pub mod session;

pub use audit::{AUDIT_LIMIT, Actor, AuditAction, AuditLog, AuditQuery};
pub use event::{EVENT_LIMIT, NewSystemEvent, Severity, SystemEvent, recent_events};
pub use metrics::{
    ActivityCounts, HealthStatus, METRICS_EVENT_LIMIT, SystemHealth, SystemMetrics, SystemReport,
    compute_metrics,
};
pub use session::{DEFAULT_IDLE_SECONDS, Heartbeat, UserSession, sweep_idle};
