//! Departmental reports with a submit/review workflow and comment thread.

pub mod comment;
pub mod report;

pub use comment::{NewComment, ReportComment};
pub use report::{
    NewReport, Report, ReportPatch, ReportPriority, ReportQuery, ReportStatus, ReportType,
    ReviewDecision,
};
