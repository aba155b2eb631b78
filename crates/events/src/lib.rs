//! Change notifications.
//!
//! Every successful mutation publishes a coarse [`ChangeEvent`]; subscribers
//! treat it as an invalidate-and-refetch signal, never as a source of truth.

pub mod bus;
pub mod change;
pub mod filter;

pub use bus::{BroadcastChangeBus, ChangeBus, DEFAULT_CAPACITY};
pub use change::{ChangeAction, ChangeEvent};
pub use filter::ChangeFilter;
