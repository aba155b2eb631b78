//! Entity trait: identity + continuity across state changes.

use uuid::Uuid;

use crate::id::DepartmentId;

/// A stored record with a stable identity.
///
/// `KIND` names the table the record lives in; it is used by stores as the
/// partition key and by the change feed as the topic.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Strongly-typed entity identifier.
    type Id: Copy
        + Eq
        + core::hash::Hash
        + core::fmt::Debug
        + core::fmt::Display
        + From<Uuid>
        + Into<Uuid>
        + Send
        + Sync
        + 'static;

    /// Table / collection name.
    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Department the record is scoped to, if any.
    fn department_id(&self) -> Option<DepartmentId> {
        None
    }
}
