//! Request bodies and query strings that do not map onto a domain or
//! service input type directly.

use serde::Deserialize;

use opsconsole_core::{DepartmentId, FleetId, UserId};

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentScope {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DueWindow {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    /// Days ahead that count as "due soon".
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueFilter {
    #[serde(default)]
    pub include_resolved: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceFilter {
    #[serde(default)]
    pub fleet_id: Option<FleetId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproverFilter {
    #[serde(default)]
    pub include_inactive: bool,
}

/// `?tables=inventory_items,stock_transactions`; empty means everything.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub tables: Option<String>,
}

impl StreamQuery {
    pub fn tables(&self) -> Vec<String> {
        self.tables
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteResetRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct InitiateResetRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct GrantAccessRequest {
    pub department_id: DepartmentId,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceAccessRequest {
    #[serde(default)]
    pub department_ids: Vec<DepartmentId>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub permission: String,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}
