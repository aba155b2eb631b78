use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::AppRole;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "warehouse.write").
/// The wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const WILDCARD: Permission = Permission::from_static("*");

pub const FLEET_READ: Permission = Permission::from_static("fleet.read");
pub const FLEET_WRITE: Permission = Permission::from_static("fleet.write");

pub const WAREHOUSE_READ: Permission = Permission::from_static("warehouse.read");
pub const WAREHOUSE_WRITE: Permission = Permission::from_static("warehouse.write");
pub const WAREHOUSE_REQUESTS_CREATE: Permission = Permission::from_static("warehouse.requests.create");
pub const WAREHOUSE_APPROVERS_MANAGE: Permission = Permission::from_static("warehouse.approvers.manage");
pub const WAREHOUSE_STRUCTURE_MANAGE: Permission = Permission::from_static("warehouse.structure.manage");

pub const TICKETS_READ: Permission = Permission::from_static("tickets.read");
pub const TICKETS_CREATE: Permission = Permission::from_static("tickets.create");

pub const REPORTS_READ: Permission = Permission::from_static("reports.read");
pub const REPORTS_WRITE: Permission = Permission::from_static("reports.write");
pub const REPORTS_REVIEW: Permission = Permission::from_static("reports.review");

pub const OPERATIONS_READ: Permission = Permission::from_static("operations.read");
pub const OPERATIONS_WRITE: Permission = Permission::from_static("operations.write");

pub const AUDIT_READ: Permission = Permission::from_static("audit.read");
pub const USERS_MANAGE: Permission = Permission::from_static("users.manage");
pub const DEPARTMENTS_MANAGE: Permission = Permission::from_static("departments.manage");

const STAFF: &[Permission] = &[
    FLEET_READ,
    WAREHOUSE_READ,
    TICKETS_READ,
    TICKETS_CREATE,
    REPORTS_READ,
    REPORTS_WRITE,
    OPERATIONS_READ,
    OPERATIONS_WRITE,
];

const SUPERVISOR: &[Permission] = &[FLEET_WRITE, WAREHOUSE_WRITE, WAREHOUSE_REQUESTS_CREATE];

const MANAGER: &[Permission] = &[
    REPORTS_REVIEW,
    WAREHOUSE_APPROVERS_MANAGE,
    WAREHOUSE_STRUCTURE_MANAGE,
];

const DIRECTOR: &[Permission] = &[AUDIT_READ];

const ADMIN: &[Permission] = &[USERS_MANAGE, DEPARTMENTS_MANAGE];

/// Role → permission mapping.
///
/// Each rank inherits every permission of the ranks below it; `super_admin`
/// holds the wildcard.
pub fn role_permissions(role: AppRole) -> Vec<Permission> {
    if role == AppRole::SuperAdmin {
        return vec![WILDCARD];
    }

    let tiers: [(AppRole, &[Permission]); 5] = [
        (AppRole::Staff, STAFF),
        (AppRole::Supervisor, SUPERVISOR),
        (AppRole::Manager, MANAGER),
        (AppRole::Director, DIRECTOR),
        (AppRole::Admin, ADMIN),
    ];

    tiers
        .iter()
        .filter(|(tier, _)| *tier <= role)
        .flat_map(|(_, perms)| perms.iter().cloned())
        .collect()
}

/// Human-readable description for catalogue endpoints.
pub fn permission_description(perm: &str) -> Option<String> {
    if perm == "*" {
        return Some("Wildcard permission - grants all permissions".to_string());
    }

    let (area, action) = perm.rsplit_once('.')?;
    let action_desc = match action {
        "read" => "View/list",
        "write" => "Create/update/delete",
        "create" => "Create new",
        "manage" => "Manage",
        "review" => "Review and decide on",
        other => other,
    };
    Some(format!("{action_desc} {} records", area.replace('.', " ")))
}
