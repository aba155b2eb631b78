//! Departments and the people in them.
//!
//! User accounts, role rows, extra department grants and admin-initiated
//! password resets. Pure records and rules; persistence lives in infra.

pub mod access;
pub mod account;
pub mod department;
pub mod reset;
pub mod role;

pub use access::DepartmentAccess;
pub use account::{NewUserAccount, ProfilePatch, UserAccount, UserProfile, normalize_email};
pub use department::{Department, DepartmentPatch, NewDepartment};
pub use reset::{PasswordReset, RESET_TTL_HOURS};
pub use role::UserRole;
