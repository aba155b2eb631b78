//! Application services.
//!
//! Each area (`fleet`, `warehouse`, ...) adds an `impl Services` block with
//! its operations. A call runs as: authorize against the [`Principal`], load,
//! let the domain crate validate and compute the new state, write, then
//! journal (change event + audit row) and notify. All validation happens
//! before the first write; journal and notification failures are logged and
//! never fail the call.
//!
//! Calls that touch more than one record stage the writes in a
//! [`WriteBatch`] and commit once. Read-modify-write calls on shared counters
//! (stock quantities, fleet service dates) write with the version they read
//! and start over from fresh reads when the store reports the row as stale.

use std::sync::Arc;

use chrono::Duration;

use opsconsole_auth::{JwtIssuer, Permission, Principal, authorize, authorize_in_department};
use opsconsole_core::{ClassificationId, DepartmentId, DomainError, Entity};
use opsconsole_events::{BroadcastChangeBus, ChangeBus};
use opsconsole_monitoring::{Actor, DEFAULT_IDLE_SECONDS};

use crate::blob::{BlobStore, InMemoryBlobStore};
use crate::store::{Record, RecordStore, WriteBatch};
use crate::stores::Stores;

mod error;
mod journal;

pub mod admin;
pub mod directory;
pub mod fleet;
pub mod helpdesk;
pub mod monitoring;
pub mod notifications;
pub mod operations;
pub mod reports;
pub mod storage;
pub mod warehouse;

pub use error::{ServiceError, ServiceResult};
pub(crate) use journal::Change;

pub const DEFAULT_SERVICE_DESK_CODE: &str = "IT";
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 720;

/// Attempts for a versioned read-modify-write before the stale error is
/// handed back to the caller.
pub(crate) const MAX_WRITE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Department whose members work the ticket queue.
    pub service_desk_department_code: String,
    /// Folder listed by the IT equipment view.
    pub it_equipment_classification_id: Option<ClassificationId>,
    /// Sessions without a heartbeat for this long are swept inactive.
    pub session_idle: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_desk_department_code: DEFAULT_SERVICE_DESK_CODE.to_string(),
            it_equipment_classification_id: None,
            session_idle: Duration::seconds(DEFAULT_IDLE_SECONDS),
        }
    }
}

pub struct Services {
    pub(crate) stores: Stores,
    pub(crate) bus: Arc<dyn ChangeBus>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) issuer: JwtIssuer,
    pub(crate) config: ServiceConfig,
}

impl Services {
    pub fn new(
        stores: Stores,
        bus: Arc<dyn ChangeBus>,
        blobs: Arc<dyn BlobStore>,
        issuer: JwtIssuer,
        config: ServiceConfig,
    ) -> Self {
        Self {
            stores,
            bus,
            blobs,
            issuer,
            config,
        }
    }

    /// Fully in-memory wiring (dev and tests).
    pub fn in_memory(jwt_secret: &[u8]) -> Self {
        Self::new(
            Stores::in_memory(),
            Arc::new(BroadcastChangeBus::default()),
            Arc::new(InMemoryBlobStore::new()),
            JwtIssuer::new(jwt_secret, Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES)),
            ServiceConfig::default(),
        )
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn bus(&self) -> Arc<dyn ChangeBus> {
        Arc::clone(&self.bus)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Applies all staged writes or none.
    pub(crate) async fn commit(&self, batch: WriteBatch) -> ServiceResult<()> {
        Ok(self.stores.writer.commit(batch).await?)
    }

    /// Records of the departments the principal can reach; everything for
    /// super_admin.
    pub(crate) async fn scoped<E: Record>(
        &self,
        store: &Arc<dyn RecordStore<E>>,
        principal: &Principal,
    ) -> ServiceResult<Vec<E>> {
        if principal.is_super_admin() {
            return Ok(store.list().await?);
        }
        let departments: Vec<DepartmentId> =
            principal.accessible_departments().into_iter().collect();
        if departments.is_empty() {
            return Ok(Vec::new());
        }
        Ok(store.list_by_department(&departments).await?)
    }
}

pub(crate) fn actor(principal: &Principal) -> Actor {
    Actor {
        user_id: principal.user_id,
        user_name: principal.full_name.clone(),
        user_email: principal.email.clone(),
    }
}

/// Department a new record goes to: the requested one, else the
/// principal's primary department.
pub(crate) fn target_department(
    principal: &Principal,
    requested: Option<DepartmentId>,
) -> ServiceResult<DepartmentId> {
    requested
        .or_else(|| principal.primary_department())
        .ok_or_else(|| DomainError::validation("department_id is required").into())
}

/// Permission check against the record's own department when it has one.
pub(crate) fn ensure_record_access<E: Entity>(
    principal: &Principal,
    permission: &Permission,
    record: &E,
) -> ServiceResult<()> {
    match record.department_id() {
        Some(department) => authorize_in_department(principal, permission, department)?,
        None => authorize(principal, permission)?,
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Seeding helpers shared by the service tests.

    use chrono::Utc;

    use opsconsole_auth::{AppRole, Principal, RoleAssignment};
    use opsconsole_core::DepartmentId;
    use opsconsole_directory::{Department, NewDepartment, NewUserAccount, UserAccount, UserRole};

    use super::Services;

    pub const PASSWORD: &str = "Sup3r-Secret!";

    pub async fn department(services: &Services, code: &str) -> Department {
        let dept = Department::create(
            NewDepartment {
                code: code.into(),
                name: format!("{code} department"),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        services.stores.departments.insert(dept.clone()).await.unwrap();
        dept
    }

    /// Stores an account plus its role row and returns the resolved principal.
    pub async fn user(
        services: &Services,
        email: &str,
        role: AppRole,
        department: Option<DepartmentId>,
    ) -> Principal {
        let now = Utc::now();
        let account = UserAccount::create(
            NewUserAccount {
                email: email.into(),
                password_hash: opsconsole_auth::hash_password(PASSWORD).unwrap(),
                full_name: Some(email.split('@').next().unwrap_or(email).to_string()),
                department_id: department,
                role,
            },
            now,
        )
        .unwrap();
        services.stores.accounts.insert(account.clone()).await.unwrap();
        services
            .stores
            .user_roles
            .insert(UserRole::new(account.id, role, department, now))
            .await
            .unwrap();
        Principal::new(account.id, account.email, vec![RoleAssignment::new(role, department)])
            .with_full_name(account.full_name)
    }

    pub fn services() -> Services {
        Services::in_memory(b"test-secret")
    }
}
