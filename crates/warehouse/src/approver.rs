use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{ApproverId, DomainResult, Entity, optional_text, require_text};

/// Person whose sign-off is attached to item requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub id: ApproverId,
    pub full_name: String,
    pub position: Option<String>,
    pub signature_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Approver {
    type Id = ApproverId;
    const KIND: &'static str = "item_request_approvers";

    fn id(&self) -> ApproverId {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApprover {
    pub full_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub signature_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverPatch {
    pub full_name: Option<String>,
    pub position: Option<String>,
    pub signature_url: Option<String>,
    pub is_active: Option<bool>,
}

impl Approver {
    pub fn create(input: NewApprover, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: ApproverId::new(),
            full_name: require_text("full_name", &input.full_name)?,
            position: optional_text(input.position),
            signature_url: optional_text(input.signature_url),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: ApproverPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.full_name {
            self.full_name = require_text("full_name", &name)?;
        }
        if patch.position.is_some() {
            self.position = optional_text(patch.position);
        }
        if patch.signature_url.is_some() {
            self.signature_url = optional_text(patch.signature_url);
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Removal keeps the row so past requests still resolve their approver.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }
}

/// Active approvers ordered by name.
pub fn active_by_name(mut approvers: Vec<Approver>) -> Vec<Approver> {
    approvers.retain(|a| a.is_active);
    approvers.sort_by(|a, b| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()));
    approvers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deactivated_approvers_drop_from_listing() {
        let now = Utc::now();
        let mk = |n: &str| {
            Approver::create(
                NewApprover {
                    full_name: n.into(),
                    ..Default::default()
                },
                now,
            )
            .unwrap()
        };
        let mut zed = mk("zed");
        let list = vec![mk("Bea"), mk("amos"), zed.clone()];
        let names: Vec<_> = active_by_name(list.clone())
            .into_iter()
            .map(|a| a.full_name)
            .collect();
        assert_eq!(names, vec!["amos", "Bea", "zed"]);

        zed.deactivate(now);
        let list = vec![list[0].clone(), list[1].clone(), zed];
        assert_eq!(active_by_name(list).len(), 2);
    }
}
