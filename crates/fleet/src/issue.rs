use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DepartmentId, DomainError, DomainResult, Entity, FleetId, FleetIssueId, UserId, require_text,
};

use crate::Fleet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetIssue {
    pub id: FleetIssueId,
    pub fleet_id: FleetId,
    pub department_id: DepartmentId,
    pub issue_description: String,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for FleetIssue {
    type Id = FleetIssueId;
    const KIND: &'static str = "fleet_issues";

    fn id(&self) -> FleetIssueId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFleetIssue {
    pub issue_description: String,
}

impl FleetIssue {
    pub fn report(fleet: &Fleet, input: NewFleetIssue, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: FleetIssueId::new(),
            fleet_id: fleet.id,
            department_id: fleet.department_id,
            issue_description: require_text("issue_description", &input.issue_description)?,
            is_resolved: false,
            resolved_at: None,
            resolved_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn resolve(&mut self, by: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if self.is_resolved {
            return Err(DomainError::conflict("issue is already resolved"));
        }
        self.is_resolved = true;
        self.resolved_at = Some(now);
        self.resolved_by = Some(by);
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewFleet;

    #[test]
    fn resolving_twice_conflicts() {
        let now = Utc::now();
        let fleet = Fleet::create(
            DepartmentId::new(),
            NewFleet {
                fleet_number: "L-1".into(),
                machine_type: "Loader".into(),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        let mut issue = FleetIssue::report(
            &fleet,
            NewFleetIssue {
                issue_description: "Brake pressure low".into(),
            },
            now,
        )
        .unwrap();

        let user = UserId::new();
        issue.resolve(user, now).unwrap();
        assert_eq!(issue.resolved_by, Some(user));
        assert!(matches!(issue.resolve(user, now), Err(DomainError::Conflict(_))));
    }
}
