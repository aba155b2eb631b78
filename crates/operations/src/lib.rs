//! Field operations feed and the office activity board.

pub mod activity;
pub mod field;

pub use activity::{
    ActivityPatch, ActivityPriority, ActivityQuery, ActivityStats, ActivityStatus, ActivityType,
    NewActivity, OfficeActivity, UPCOMING_LIMIT, activity_stats, board_order, today, upcoming,
};
pub use field::{
    FieldPriority, FieldStatus, FieldUpdate, FieldUpdatePatch, FieldUpdateQuery, GALLERY_LIMIT,
    NewFieldUpdate, photo_gallery, pinned, urgent,
};
