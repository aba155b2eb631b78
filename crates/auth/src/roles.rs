use serde::{Deserialize, Serialize};

use opsconsole_core::DomainError;

/// Application role.
///
/// Roles form a strict hierarchy; the declaration order is the rank order
/// (`Staff` lowest, `SuperAdmin` highest).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    Staff,
    Supervisor,
    Manager,
    Director,
    Admin,
    SuperAdmin,
}

impl AppRole {
    pub const ALL: [AppRole; 6] = [
        AppRole::Staff,
        AppRole::Supervisor,
        AppRole::Manager,
        AppRole::Director,
        AppRole::Admin,
        AppRole::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Staff => "staff",
            AppRole::Supervisor => "supervisor",
            AppRole::Manager => "manager",
            AppRole::Director => "director",
            AppRole::Admin => "admin",
            AppRole::SuperAdmin => "super_admin",
        }
    }

    /// True for the roles that may use the user administration surface.
    pub fn is_administrative(&self) -> bool {
        matches!(self, AppRole::Admin | AppRole::SuperAdmin)
    }

    pub fn description(&self) -> &'static str {
        match self {
            AppRole::Staff => "Department staff: read access and day-to-day submissions",
            AppRole::Supervisor => "Supervises department operations and stock movements",
            AppRole::Manager => "Manages department structure, approvers and report reviews",
            AppRole::Director => "Cross-cutting oversight including the audit trail",
            AppRole::Admin => "Administers users and departments within their department",
            AppRole::SuperAdmin => "Full system administrator with all permissions",
        }
    }
}

impl core::fmt::Display for AppRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AppRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppRole::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}
