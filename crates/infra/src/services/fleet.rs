//! Fleet registry, maintenance log and reported issues.

use chrono::Utc;
use serde::Deserialize;

use opsconsole_auth::{
    AppRole, Principal, authorize, authorize_in_department,
    permissions::{FLEET_READ, FLEET_WRITE},
};
use opsconsole_core::{DepartmentId, DomainError, FleetId, FleetIssueId, MaintenanceRecordId};
use opsconsole_fleet::{
    DEFAULT_DUE_WITHIN_DAYS, Fleet, FleetAuditEntry, FleetIssue, FleetPatch, FleetQuery,
    FleetStats, MaintenanceOverview, MaintenanceRecord, NewFleet, NewFleetIssue,
    NewMaintenanceRecord, ServiceType, fleet_stats, maintenance_overview,
};
use opsconsole_notifications::{NewNotification, NotificationKind};

use super::{
    Change, MAX_WRITE_ATTEMPTS, ServiceError, ServiceResult, Services, ensure_record_access,
    target_department,
};
use crate::store::WriteBatch;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateFleet {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(flatten)]
    pub fleet: NewFleet,
}

impl Services {
    async fn ensure_fleet_number_free(&self, number: &str, except: Option<FleetId>) -> ServiceResult<()> {
        let number = number.trim();
        let taken = self
            .stores
            .fleets
            .list()
            .await?
            .iter()
            .any(|f| Some(f.id) != except && f.fleet_number.eq_ignore_ascii_case(number));
        if taken {
            return Err(DomainError::conflict(format!("fleet number {number} is already in use")).into());
        }
        Ok(())
    }

    /// Breakdowns go to the department's supervisors. A failed recipient
    /// lookup is logged; the maintenance record is already stored.
    async fn alert_breakdown(&self, actor: &Principal, fleet: &Fleet, record: &MaintenanceRecord) {
        let recipients = match self
            .department_members(fleet.department_id, AppRole::Supervisor)
            .await
        {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(fleet_id = %fleet.id, error = %e, "breakdown recipients lookup failed");
                return;
            }
        };
        self.notify(
            recipients.into_iter().filter(|u| *u != actor.user_id),
            NewNotification::new(
                NotificationKind::Maintenance,
                format!("Breakdown: {}", fleet.fleet_number),
            )
            .with_message(format!("{} - {}", fleet.machine_type, record.service_description))
            .with_link(format!("/fleet/{}", fleet.id)),
        )
        .await;
    }

    pub async fn list_fleets(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
        query: &FleetQuery,
    ) -> ServiceResult<Vec<Fleet>> {
        authorize(principal, &FLEET_READ)?;
        let fleets = self
            .scoped(&self.stores.fleets, principal)
            .await?
            .into_iter()
            .filter(|f| department.is_none_or(|d| f.department_id == d))
            .collect();
        Ok(query.apply(fleets))
    }

    pub async fn get_fleet(&self, principal: &Principal, id: FleetId) -> ServiceResult<Fleet> {
        let fleet = self.stores.fleets.require(id).await?;
        ensure_record_access(principal, &FLEET_READ, &fleet)?;
        Ok(fleet)
    }

    pub async fn create_fleet(&self, principal: &Principal, input: CreateFleet) -> ServiceResult<Fleet> {
        let department = target_department(principal, input.department_id)?;
        authorize_in_department(principal, &FLEET_WRITE, department)?;
        self.stores.departments.require(department).await?;
        self.ensure_fleet_number_free(&input.fleet.fleet_number, None).await?;

        let now = Utc::now();
        let fleet = Fleet::create(department, input.fleet, now)?;
        let mut batch = WriteBatch::new();
        batch.insert(&fleet)?;
        batch.insert(&FleetAuditEntry::record(
            fleet.id,
            department,
            principal.user_id,
            "created",
            now,
        ))?;
        self.commit(batch).await?;
        self.journal(principal, Change::insert(&fleet)).await;
        tracing::info!(fleet_id = %fleet.id, fleet_number = %fleet.fleet_number, "fleet created");
        Ok(fleet)
    }

    pub async fn update_fleet(
        &self,
        principal: &Principal,
        id: FleetId,
        patch: FleetPatch,
    ) -> ServiceResult<Fleet> {
        if let Some(number) = &patch.fleet_number {
            self.ensure_fleet_number_free(number, Some(id)).await?;
        }

        let mut attempt = 1;
        let (before, fleet) = loop {
            let read = self.stores.fleets.require_versioned(id).await?;
            ensure_record_access(principal, &FLEET_WRITE, &read.record)?;

            let now = Utc::now();
            let mut fleet = read.record.clone();
            let changes = fleet.apply(patch.clone(), now)?;
            if changes.is_empty() {
                return Ok(fleet);
            }

            let mut batch = WriteBatch::new();
            batch.update(&fleet, read.expected())?;
            for entry in
                FleetAuditEntry::from_changes(id, fleet.department_id, principal.user_id, &changes, now)
            {
                batch.insert(&entry)?;
            }
            match self.commit(batch).await {
                Ok(()) => break (read.record, fleet),
                Err(ServiceError::Store(e)) if e.is_stale() && attempt < MAX_WRITE_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };
        self.journal(principal, Change::update(&before, &fleet)).await;
        Ok(fleet)
    }

    /// Removes the fleet with its maintenance records, issues and change trail.
    pub async fn delete_fleet(&self, principal: &Principal, id: FleetId) -> ServiceResult<()> {
        let fleet = self.stores.fleets.require(id).await?;
        ensure_record_access(principal, &FLEET_WRITE, &fleet)?;

        let department = [fleet.department_id];
        let mut batch = WriteBatch::new();
        for record in self.stores.maintenance.list_by_department(&department).await? {
            if record.fleet_id == id {
                batch.delete::<MaintenanceRecord>(record.id);
            }
        }
        for issue in self.stores.fleet_issues.list_by_department(&department).await? {
            if issue.fleet_id == id {
                batch.delete::<FleetIssue>(issue.id);
            }
        }
        for entry in self.stores.fleet_audit.list_by_department(&department).await? {
            if entry.fleet_id == id {
                batch.delete::<FleetAuditEntry>(entry.id);
            }
        }
        batch.delete::<Fleet>(id);
        self.commit(batch).await?;
        self.journal(principal, Change::delete(&fleet)).await;
        tracing::info!(fleet_id = %id, "fleet deleted");
        Ok(())
    }

    /// Field-level change trail, newest first.
    pub async fn fleet_history(
        &self,
        principal: &Principal,
        id: FleetId,
    ) -> ServiceResult<Vec<FleetAuditEntry>> {
        let fleet = self.get_fleet(principal, id).await?;
        let mut entries: Vec<FleetAuditEntry> = self
            .stores
            .fleet_audit
            .list_by_department(&[fleet.department_id])
            .await?
            .into_iter()
            .filter(|e| e.fleet_id == id)
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    // ── maintenance ────────────────────────────────────────────────────────

    /// Log a service and carry its effects (hours, inspection date,
    /// breakdown status) onto the fleet.
    pub async fn record_maintenance(
        &self,
        principal: &Principal,
        input: NewMaintenanceRecord,
    ) -> ServiceResult<MaintenanceRecord> {
        let mut attempt = 1;
        let (before, fleet, record, changed) = loop {
            let read = self.stores.fleets.require_versioned(input.fleet_id).await?;
            ensure_record_access(principal, &FLEET_WRITE, &read.record)?;

            let now = Utc::now();
            let record = MaintenanceRecord::create(&read.record, input.clone(), now)?;
            let mut fleet = read.record.clone();
            let changes = fleet.apply(record.fleet_effects(&read.record), now)?;

            let mut batch = WriteBatch::new();
            batch.insert(&record)?;
            if !changes.is_empty() {
                batch.update(&fleet, read.expected())?;
                for entry in FleetAuditEntry::from_changes(
                    fleet.id,
                    fleet.department_id,
                    principal.user_id,
                    &changes,
                    now,
                ) {
                    batch.insert(&entry)?;
                }
            }
            match self.commit(batch).await {
                Ok(()) => break (read.record, fleet, record, !changes.is_empty()),
                Err(ServiceError::Store(e)) if e.is_stale() && attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(fleet_id = %input.fleet_id, attempt, "fleet changed during maintenance, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        self.journal(principal, Change::insert(&record)).await;
        if changed {
            self.journal(principal, Change::update(&before, &fleet)).await;
        }
        if record.service_type == ServiceType::Breakdown {
            self.alert_breakdown(principal, &fleet, &record).await;
        }
        Ok(record)
    }

    /// Maintenance records, newest service first.
    pub async fn list_maintenance(
        &self,
        principal: &Principal,
        fleet_id: Option<FleetId>,
    ) -> ServiceResult<Vec<MaintenanceRecord>> {
        authorize(principal, &FLEET_READ)?;
        let mut records: Vec<MaintenanceRecord> = self
            .scoped(&self.stores.maintenance, principal)
            .await?
            .into_iter()
            .filter(|r| fleet_id.is_none_or(|f| r.fleet_id == f))
            .collect();
        records.sort_by(|a, b| {
            b.maintenance_date
                .cmp(&a.maintenance_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(records)
    }

    pub async fn delete_maintenance(
        &self,
        principal: &Principal,
        id: MaintenanceRecordId,
    ) -> ServiceResult<()> {
        let record = self.stores.maintenance.require(id).await?;
        ensure_record_access(principal, &FLEET_WRITE, &record)?;
        self.stores.maintenance.delete(id).await?;
        self.journal(principal, Change::delete(&record)).await;
        Ok(())
    }

    pub async fn maintenance_overview(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
        due_within_days: Option<i64>,
    ) -> ServiceResult<MaintenanceOverview> {
        let records: Vec<MaintenanceRecord> = self
            .list_maintenance(principal, None)
            .await?
            .into_iter()
            .filter(|r| department.is_none_or(|d| r.department_id == d))
            .collect();
        Ok(maintenance_overview(
            &records,
            Utc::now().date_naive(),
            due_within_days.unwrap_or(DEFAULT_DUE_WITHIN_DAYS),
        ))
    }

    // ── issues ─────────────────────────────────────────────────────────────

    pub async fn report_fleet_issue(
        &self,
        principal: &Principal,
        fleet_id: FleetId,
        input: NewFleetIssue,
    ) -> ServiceResult<FleetIssue> {
        let fleet = self.stores.fleets.require(fleet_id).await?;
        ensure_record_access(principal, &FLEET_WRITE, &fleet)?;
        let issue = FleetIssue::report(&fleet, input, Utc::now())?;
        self.stores.fleet_issues.insert(issue.clone()).await?;
        self.journal(principal, Change::insert(&issue)).await;
        Ok(issue)
    }

    /// Issues, open ones first then newest first.
    pub async fn list_fleet_issues(
        &self,
        principal: &Principal,
        fleet_id: Option<FleetId>,
        include_resolved: bool,
    ) -> ServiceResult<Vec<FleetIssue>> {
        authorize(principal, &FLEET_READ)?;
        let mut issues: Vec<FleetIssue> = self
            .scoped(&self.stores.fleet_issues, principal)
            .await?
            .into_iter()
            .filter(|i| fleet_id.is_none_or(|f| i.fleet_id == f))
            .filter(|i| include_resolved || !i.is_resolved)
            .collect();
        issues.sort_by(|a, b| {
            a.is_resolved
                .cmp(&b.is_resolved)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(issues)
    }

    pub async fn resolve_fleet_issue(
        &self,
        principal: &Principal,
        id: FleetIssueId,
    ) -> ServiceResult<FleetIssue> {
        let before = self.stores.fleet_issues.require(id).await?;
        ensure_record_access(principal, &FLEET_WRITE, &before)?;
        let mut issue = before.clone();
        issue.resolve(principal.user_id, Utc::now())?;
        self.stores.fleet_issues.update(issue.clone()).await?;
        self.journal(principal, Change::update(&before, &issue)).await;
        Ok(issue)
    }

    pub async fn fleet_stats(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
        due_within_days: Option<i64>,
    ) -> ServiceResult<FleetStats> {
        authorize(principal, &FLEET_READ)?;
        let in_scope = |d: DepartmentId| department.is_none_or(|want| want == d);
        let fleets: Vec<Fleet> = self
            .scoped(&self.stores.fleets, principal)
            .await?
            .into_iter()
            .filter(|f| in_scope(f.department_id))
            .collect();
        let issues: Vec<FleetIssue> = self
            .scoped(&self.stores.fleet_issues, principal)
            .await?
            .into_iter()
            .filter(|i| in_scope(i.department_id))
            .collect();
        let records: Vec<MaintenanceRecord> = self
            .scoped(&self.stores.maintenance, principal)
            .await?
            .into_iter()
            .filter(|r| in_scope(r.department_id))
            .collect();
        Ok(fleet_stats(
            &fleets,
            &issues,
            &records,
            Utc::now().date_naive(),
            due_within_days.unwrap_or(DEFAULT_DUE_WITHIN_DAYS),
        ))
    }
}
