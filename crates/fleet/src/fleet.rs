use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DepartmentId, DomainError, DomainResult, Entity, FleetId, UserId, matches_query,
    optional_text, require_text,
};

use crate::FieldChange;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetStatus {
    #[default]
    Operational,
    UnderMaintenance,
    OutOfService,
}

impl FleetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FleetStatus::Operational => "operational",
            FleetStatus::UnderMaintenance => "under_maintenance",
            FleetStatus::OutOfService => "out_of_service",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetCondition {
    Operational,
    GoodCondition,
    Grounded,
    UnderRepair,
    WaitingParts,
    Decommissioned,
}

impl FleetCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            FleetCondition::Operational => "operational",
            FleetCondition::GoodCondition => "good_condition",
            FleetCondition::Grounded => "grounded",
            FleetCondition::UnderRepair => "under_repair",
            FleetCondition::WaitingParts => "waiting_parts",
            FleetCondition::Decommissioned => "decommissioned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    pub id: FleetId,
    pub department_id: DepartmentId,
    pub fleet_number: String,
    pub machine_type: String,
    pub status: FleetStatus,
    pub condition: Option<FleetCondition>,
    pub current_status: Option<String>,
    pub operator_id: Option<UserId>,
    pub machine_hours: f64,
    pub delivery_date: Option<NaiveDate>,
    pub last_inspection_date: Option<NaiveDate>,
    pub checked_by_name: Option<String>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Fleet {
    type Id = FleetId;
    const KIND: &'static str = "fleets";

    fn id(&self) -> FleetId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFleet {
    pub fleet_number: String,
    pub machine_type: String,
    #[serde(default)]
    pub status: FleetStatus,
    #[serde(default)]
    pub condition: Option<FleetCondition>,
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub operator_id: Option<UserId>,
    #[serde(default)]
    pub machine_hours: Option<f64>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_inspection_date: Option<NaiveDate>,
    #[serde(default)]
    pub checked_by_name: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetPatch {
    pub fleet_number: Option<String>,
    pub machine_type: Option<String>,
    pub status: Option<FleetStatus>,
    pub condition: Option<FleetCondition>,
    pub current_status: Option<String>,
    pub operator_id: Option<UserId>,
    pub machine_hours: Option<f64>,
    pub delivery_date: Option<NaiveDate>,
    pub last_inspection_date: Option<NaiveDate>,
    pub checked_by_name: Option<String>,
    pub remarks: Option<String>,
}

fn require_hours(hours: f64) -> DomainResult<f64> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(DomainError::validation("machine_hours cannot be negative"));
    }
    Ok(hours)
}

fn show<T: core::fmt::Display>(value: &Option<T>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

impl Fleet {
    pub fn create(department_id: DepartmentId, input: NewFleet, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: FleetId::new(),
            department_id,
            fleet_number: require_text("fleet_number", &input.fleet_number)?,
            machine_type: require_text("machine_type", &input.machine_type)?,
            status: input.status,
            condition: input.condition,
            current_status: optional_text(input.current_status),
            operator_id: input.operator_id,
            machine_hours: require_hours(input.machine_hours.unwrap_or(0.0))?,
            delivery_date: input.delivery_date,
            last_inspection_date: input.last_inspection_date,
            checked_by_name: optional_text(input.checked_by_name),
            remarks: optional_text(input.remarks),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch and return one change per field whose value moved.
    pub fn apply(&mut self, patch: FleetPatch, now: DateTime<Utc>) -> DomainResult<Vec<FieldChange>> {
        let mut next = self.clone();
        let mut changes = Vec::new();

        if let Some(v) = patch.fleet_number {
            next.fleet_number = require_text("fleet_number", &v)?;
        }
        if let Some(v) = patch.machine_type {
            next.machine_type = require_text("machine_type", &v)?;
        }
        if let Some(v) = patch.status {
            next.status = v;
        }
        if patch.condition.is_some() {
            next.condition = patch.condition;
        }
        if patch.current_status.is_some() {
            next.current_status = optional_text(patch.current_status);
        }
        if patch.operator_id.is_some() {
            next.operator_id = patch.operator_id;
        }
        if let Some(v) = patch.machine_hours {
            next.machine_hours = require_hours(v)?;
        }
        if patch.delivery_date.is_some() {
            next.delivery_date = patch.delivery_date;
        }
        if patch.last_inspection_date.is_some() {
            next.last_inspection_date = patch.last_inspection_date;
        }
        if patch.checked_by_name.is_some() {
            next.checked_by_name = optional_text(patch.checked_by_name);
        }
        if patch.remarks.is_some() {
            next.remarks = optional_text(patch.remarks);
        }

        let mut diff = |field: &'static str, old: Option<String>, new: Option<String>| {
            if old != new {
                changes.push(FieldChange { field, old, new });
            }
        };
        diff("fleet_number", Some(self.fleet_number.clone()), Some(next.fleet_number.clone()));
        diff("machine_type", Some(self.machine_type.clone()), Some(next.machine_type.clone()));
        diff("status", Some(self.status.as_str().into()), Some(next.status.as_str().into()));
        diff(
            "condition",
            self.condition.map(|c| c.as_str().into()),
            next.condition.map(|c| c.as_str().into()),
        );
        diff("current_status", self.current_status.clone(), next.current_status.clone());
        diff("operator_id", show(&self.operator_id), show(&next.operator_id));
        diff(
            "machine_hours",
            Some(self.machine_hours.to_string()),
            Some(next.machine_hours.to_string()),
        );
        diff("delivery_date", show(&self.delivery_date), show(&next.delivery_date));
        diff(
            "last_inspection_date",
            show(&self.last_inspection_date),
            show(&next.last_inspection_date),
        );
        diff("checked_by_name", self.checked_by_name.clone(), next.checked_by_name.clone());
        diff("remarks", self.remarks.clone(), next.remarks.clone());

        if !changes.is_empty() {
            next.updated_at = now;
        }
        *self = next;
        Ok(changes)
    }
}

/// List filter for the fleet overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<FleetStatus>,
}

impl FleetQuery {
    pub fn matches(&self, fleet: &Fleet) -> bool {
        if self.status.is_some_and(|s| s != fleet.status) {
            return false;
        }
        let remarks = fleet.remarks.as_deref().unwrap_or_default();
        matches_query(
            self.search.as_deref().unwrap_or_default(),
            [fleet.fleet_number.as_str(), fleet.machine_type.as_str(), remarks],
        )
    }

    /// Filtered and sorted by fleet number.
    pub fn apply(&self, fleets: Vec<Fleet>) -> Vec<Fleet> {
        let mut out: Vec<Fleet> = fleets.into_iter().filter(|f| self.matches(f)).collect();
        out.sort_by(|a, b| a.fleet_number.cmp(&b.fleet_number));
        out
    }
}
