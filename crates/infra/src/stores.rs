//! One record store per entity kind, behind trait objects so the services
//! are backend-agnostic, plus the batch writer for the same backend.

use std::sync::Arc;

use sqlx::PgPool;

use opsconsole_directory::{Department, DepartmentAccess, PasswordReset, UserAccount, UserRole};
use opsconsole_fleet::{FleetAuditEntry, Fleet, FleetIssue, MaintenanceRecord};
use opsconsole_helpdesk::SupportTicket;
use opsconsole_monitoring::{AuditLog, SystemEvent, SystemReport, UserSession};
use opsconsole_notifications::Notification;
use opsconsole_operations::{FieldUpdate, OfficeActivity};
use opsconsole_reports::{Report, ReportComment};
use opsconsole_warehouse::{
    Approver, Classification, InventoryItem, ItemRequest, Location, StockTransaction,
};

use crate::store::{
    BatchWriter, InMemoryRecordStore, MemoryDatabase, PostgresBatchWriter, PostgresRecordStore,
    RecordStore,
};

macro_rules! stores {
    ($($field:ident: $ty:ty,)+) => {
        #[derive(Clone)]
        pub struct Stores {
            $(pub $field: Arc<dyn RecordStore<$ty>>,)+
            /// Commits writes that span several stores as one unit.
            pub writer: Arc<dyn BatchWriter>,
        }

        impl Stores {
            pub fn in_memory() -> Self {
                let db = Arc::new(MemoryDatabase::new());
                Self {
                    $($field: Arc::new(InMemoryRecordStore::<$ty>::in_database(Arc::clone(&db))),)+
                    writer: db,
                }
            }

            pub fn postgres(pool: PgPool) -> Self {
                Self {
                    $($field: Arc::new(PostgresRecordStore::<$ty>::new(pool.clone())),)+
                    writer: Arc::new(PostgresBatchWriter::new(pool)),
                }
            }
        }
    };
}

stores! {
    departments: Department,
    accounts: UserAccount,
    user_roles: UserRole,
    department_access: DepartmentAccess,
    password_resets: PasswordReset,

    fleets: Fleet,
    maintenance: MaintenanceRecord,
    fleet_issues: FleetIssue,
    fleet_audit: FleetAuditEntry,

    classifications: Classification,
    locations: Location,
    items: InventoryItem,
    transactions: StockTransaction,
    item_requests: ItemRequest,
    approvers: Approver,

    tickets: SupportTicket,
    reports: Report,
    report_comments: ReportComment,
    field_updates: FieldUpdate,
    activities: OfficeActivity,

    notifications: Notification,
    audit_logs: AuditLog,
    sessions: UserSession,
    system_events: SystemEvent,
    system_reports: SystemReport,
}
