//! Fleet maintenance: machines, service records, reported issues and the
//! per-field change trail kept for every fleet edit.

pub mod audit;
pub mod fleet;
pub mod issue;
pub mod maintenance;
pub mod stats;

pub use audit::{FieldChange, FleetAuditEntry};
pub use fleet::{Fleet, FleetCondition, FleetPatch, FleetQuery, FleetStatus, NewFleet};
pub use issue::{FleetIssue, NewFleetIssue};
pub use maintenance::{
    MaintenanceRecord, NewMaintenanceRecord, ServiceCondition, ServiceType,
};
pub use stats::{
    DEFAULT_DUE_WITHIN_DAYS, FleetStats, MaintenanceOverview, fleet_stats, maintenance_overview,
};
