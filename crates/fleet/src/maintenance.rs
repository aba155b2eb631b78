use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DepartmentId, DomainError, DomainResult, Entity, FleetId, MaintenanceRecordId, UserId,
    optional_text, require_text,
};

use crate::{Fleet, FleetPatch, FleetStatus};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[default]
    Preventive,
    Corrective,
    Breakdown,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCondition {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub id: MaintenanceRecordId,
    pub fleet_id: FleetId,
    pub department_id: DepartmentId,
    pub service_type: ServiceType,
    pub maintenance_date: NaiveDate,
    pub service_description: String,
    pub machine_hours: Option<f64>,
    pub next_service_due: Option<NaiveDate>,
    pub condition_after_service: Option<ServiceCondition>,
    pub delivery_time_hours: Option<f64>,
    pub operator_id: Option<UserId>,
    pub checked_by: Option<String>,
    pub current_status: Option<String>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for MaintenanceRecord {
    type Id = MaintenanceRecordId;
    const KIND: &'static str = "maintenance_records";

    fn id(&self) -> MaintenanceRecordId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMaintenanceRecord {
    pub fleet_id: FleetId,
    #[serde(default)]
    pub service_type: ServiceType,
    pub maintenance_date: NaiveDate,
    pub service_description: String,
    #[serde(default)]
    pub machine_hours: Option<f64>,
    #[serde(default)]
    pub next_service_due: Option<NaiveDate>,
    #[serde(default)]
    pub condition_after_service: Option<ServiceCondition>,
    #[serde(default)]
    pub delivery_time_hours: Option<f64>,
    #[serde(default)]
    pub operator_id: Option<UserId>,
    #[serde(default)]
    pub checked_by: Option<String>,
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

fn non_negative(field: &str, value: Option<f64>) -> DomainResult<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(DomainError::validation(format!("{field} cannot be negative")))
        }
        other => Ok(other),
    }
}

impl MaintenanceRecord {
    pub fn create(fleet: &Fleet, input: NewMaintenanceRecord, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.fleet_id != fleet.id {
            return Err(DomainError::invariant("maintenance record fleet mismatch"));
        }
        if let Some(due) = input.next_service_due {
            if due < input.maintenance_date {
                return Err(DomainError::validation(
                    "next_service_due cannot be before maintenance_date",
                ));
            }
        }
        Ok(Self {
            id: MaintenanceRecordId::new(),
            fleet_id: fleet.id,
            department_id: fleet.department_id,
            service_type: input.service_type,
            maintenance_date: input.maintenance_date,
            service_description: require_text("service_description", &input.service_description)?,
            machine_hours: non_negative("machine_hours", input.machine_hours)?,
            next_service_due: input.next_service_due,
            condition_after_service: input.condition_after_service,
            delivery_time_hours: non_negative("delivery_time_hours", input.delivery_time_hours)?,
            operator_id: input.operator_id,
            checked_by: optional_text(input.checked_by),
            current_status: optional_text(input.current_status),
            remarks: optional_text(input.remarks),
            created_at: now,
            updated_at: now,
        })
    }

    /// Changes the record implies for its fleet.
    ///
    /// Hours only ever go up; the inspection date follows the service date; a
    /// breakdown takes an operational machine into maintenance.
    pub fn fleet_effects(&self, fleet: &Fleet) -> FleetPatch {
        let mut patch = FleetPatch {
            last_inspection_date: Some(self.maintenance_date),
            ..Default::default()
        };
        if let Some(hours) = self.machine_hours {
            if hours > fleet.machine_hours {
                patch.machine_hours = Some(hours);
            }
        }
        if self.service_type == ServiceType::Breakdown && fleet.status == FleetStatus::Operational {
            patch.status = Some(FleetStatus::UnderMaintenance);
        }
        patch
    }
}
