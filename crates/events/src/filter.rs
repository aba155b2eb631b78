use std::collections::BTreeSet;

use opsconsole_auth::Principal;

use crate::ChangeEvent;

/// Decides which change events a subscriber may see.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    principal: Principal,
    /// Empty means every table.
    tables: BTreeSet<String>,
}

impl ChangeFilter {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            tables: BTreeSet::new(),
        }
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.trim().is_empty())
            .collect();
        self
    }

    pub fn allows(&self, event: &ChangeEvent) -> bool {
        if !self.tables.is_empty() && !self.tables.contains(&event.table) {
            return false;
        }
        if let Some(user) = event.audience {
            return user == self.principal.user_id;
        }
        match event.department_id {
            Some(dept) => self.principal.can_access_department(dept),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use opsconsole_auth::{AppRole, RoleAssignment};
    use opsconsole_core::{DepartmentId, UserId};

    use super::*;
    use crate::ChangeAction;

    fn staff_in(dept: DepartmentId) -> Principal {
        Principal::new(
            UserId::new(),
            "s@ops.test",
            vec![RoleAssignment::new(AppRole::Staff, Some(dept))],
        )
    }

    fn event(table: &str) -> ChangeEvent {
        ChangeEvent::new(table, ChangeAction::Insert, Uuid::now_v7(), Utc::now())
    }

    #[test]
    fn department_events_stay_in_department() {
        let dept = DepartmentId::new();
        let filter = ChangeFilter::new(staff_in(dept));
        assert!(filter.allows(&event("inventory_items").in_department(Some(dept))));
        assert!(!filter.allows(&event("inventory_items").in_department(Some(DepartmentId::new()))));
        assert!(filter.allows(&event("departments")));
    }

    #[test]
    fn audience_events_reach_only_their_user() {
        let p = staff_in(DepartmentId::new());
        let filter = ChangeFilter::new(p.clone());
        assert!(filter.allows(&event("notifications").for_user(p.user_id)));
        assert!(!filter.allows(&event("notifications").for_user(UserId::new())));
    }

    #[test]
    fn table_subscription_narrows_delivery() {
        let filter = ChangeFilter::new(staff_in(DepartmentId::new())).with_tables(["fleets", " "]);
        assert!(filter.allows(&event("fleets")));
        assert!(!filter.allows(&event("reports")));
    }
}
