//! One newtype per record kind so ids cannot be mixed up.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_ids {
    ($($(#[$meta:meta])* $t:ident => $name:literal;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $t(Uuid);

            impl $t {
                /// Fresh time-ordered (v7) id.
                pub fn new() -> Self {
                    Self(Uuid::now_v7())
                }

                pub fn from_uuid(uuid: Uuid) -> Self {
                    Self(uuid)
                }

                pub fn as_uuid(&self) -> &Uuid {
                    &self.0
                }
            }

            impl Default for $t {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl core::fmt::Display for $t {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    core::fmt::Display::fmt(&self.0, f)
                }
            }

            impl From<Uuid> for $t {
                fn from(value: Uuid) -> Self {
                    Self(value)
                }
            }

            impl From<$t> for Uuid {
                fn from(value: $t) -> Self {
                    value.0
                }
            }

            impl FromStr for $t {
                type Err = DomainError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    let uuid = Uuid::from_str(s.trim())
                        .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                    Ok(Self(uuid))
                }
            }
        )+
    };
}

uuid_ids! {
    /// Department (the organisational scope most records belong to).
    DepartmentId => "DepartmentId";
    /// Authenticated user / actor identity.
    UserId => "UserId";
    RoleAssignmentId => "RoleAssignmentId";
    DepartmentAccessId => "DepartmentAccessId";
    PasswordResetId => "PasswordResetId";

    FleetId => "FleetId";
    MaintenanceRecordId => "MaintenanceRecordId";
    FleetIssueId => "FleetIssueId";
    FleetAuditId => "FleetAuditId";

    ClassificationId => "ClassificationId";
    LocationId => "LocationId";
    ItemId => "ItemId";
    TransactionId => "TransactionId";
    ItemRequestId => "ItemRequestId";
    ApproverId => "ApproverId";

    TicketId => "TicketId";
    ReportId => "ReportId";
    ReportCommentId => "ReportCommentId";
    FieldUpdateId => "FieldUpdateId";
    ActivityId => "ActivityId";

    NotificationId => "NotificationId";
    AuditLogId => "AuditLogId";
    SessionId => "SessionId";
    SystemEventId => "SystemEventId";
    SystemReportId => "SystemReportId";
}
