//! Shared domain building blocks.
//!
//! Identifiers, the domain error model, the `Entity` contract every stored
//! record implements, write versions, and the list helpers (search +
//! pagination) used by all feature areas. No IO lives here.

pub mod entity;
pub mod error;
pub mod id;
pub mod page;
pub mod search;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, optional_text, require_hex_color, require_text};
pub use id::*;
pub use page::{Page, PageRequest, paginate};
pub use search::matches_query;
pub use version::{ExpectedVersion, INITIAL_VERSION};
