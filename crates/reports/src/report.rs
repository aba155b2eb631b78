use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DepartmentId, DomainError, DomainResult, Entity, ReportId, UserId, matches_query,
    optional_text, require_text,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Incident,
    Financial,
    Performance,
    #[default]
    General,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Pending,
    InReview,
    Approved,
    Rejected,
    Escalated,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Pending => "pending",
            ReportStatus::InReview => "in_review",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Escalated => "escalated",
        }
    }
}

/// Reviewer action on a submitted report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    StartReview,
    Approve,
    Reject,
    Escalate,
}

impl ReviewDecision {
    pub fn target(&self) -> ReportStatus {
        match self {
            ReviewDecision::StartReview => ReportStatus::InReview,
            ReviewDecision::Approve => ReportStatus::Approved,
            ReviewDecision::Reject => ReportStatus::Rejected,
            ReviewDecision::Escalate => ReportStatus::Escalated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::StartReview => "start_review",
            ReviewDecision::Approve => "approve",
            ReviewDecision::Reject => "reject",
            ReviewDecision::Escalate => "escalate",
        }
    }

    fn allowed_from(&self, current: ReportStatus) -> bool {
        use ReportStatus::*;
        match self {
            ReviewDecision::StartReview => matches!(current, Pending | Escalated),
            ReviewDecision::Approve | ReviewDecision::Reject => {
                matches!(current, InReview | Escalated)
            }
            ReviewDecision::Escalate => current == InReview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub title: String,
    pub description: Option<String>,
    pub department_id: DepartmentId,
    pub priority: ReportPriority,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub created_by: UserId,
    pub assigned_to: Option<UserId>,
    pub attachments: Vec<String>,
    pub data: serde_json::Value,
    pub submitted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Report {
    type Id = ReportId;
    const KIND: &'static str = "reports";

    fn id(&self) -> ReportId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub department_id: DepartmentId,
    #[serde(default)]
    pub priority: ReportPriority,
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Content edits, allowed while the report is a draft or was rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<ReportPriority>,
    pub report_type: Option<ReportType>,
    pub assigned_to: Option<UserId>,
    pub attachments: Option<Vec<String>>,
    pub data: Option<serde_json::Value>,
}

impl Report {
    pub fn create(input: NewReport, created_by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: ReportId::new(),
            title: require_text("title", &input.title)?,
            description: optional_text(input.description),
            department_id: input.department_id,
            priority: input.priority,
            report_type: input.report_type,
            status: ReportStatus::Draft,
            created_by,
            assigned_to: input.assigned_to,
            attachments: input.attachments,
            data: input.data,
            submitted_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_editable(&self) -> bool {
        matches!(self.status, ReportStatus::Draft | ReportStatus::Rejected)
    }

    pub fn apply(&mut self, patch: ReportPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_editable() {
            return Err(DomainError::conflict(format!(
                "report is {} and can no longer be edited",
                self.status.as_str()
            )));
        }
        let mut next = self.clone();
        if let Some(title) = patch.title {
            next.title = require_text("title", &title)?;
        }
        if patch.description.is_some() {
            next.description = optional_text(patch.description);
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(report_type) = patch.report_type {
            next.report_type = report_type;
        }
        if patch.assigned_to.is_some() {
            next.assigned_to = patch.assigned_to;
        }
        if let Some(attachments) = patch.attachments {
            next.attachments = attachments;
        }
        if let Some(data) = patch.data {
            next.data = data;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Only the author submits; drafts and rejected reports go back to pending.
    pub fn submit(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if actor != self.created_by {
            return Err(DomainError::Unauthorized);
        }
        if !self.is_editable() {
            return Err(DomainError::conflict(format!(
                "cannot submit a report that is {}",
                self.status.as_str()
            )));
        }
        self.status = ReportStatus::Pending;
        self.submitted_at = Some(now);
        self.resolved_at = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn review(&mut self, decision: ReviewDecision, now: DateTime<Utc>) -> DomainResult<()> {
        if !decision.allowed_from(self.status) {
            return Err(DomainError::conflict(format!(
                "cannot {} a report that is {}",
                decision.as_str(),
                self.status.as_str()
            )));
        }
        self.status = decision.target();
        if matches!(self.status, ReportStatus::Approved | ReportStatus::Rejected) {
            self.resolved_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub status: Option<ReportStatus>,
    #[serde(default)]
    pub priority: Option<ReportPriority>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ReportQuery {
    /// Newest first.
    pub fn apply(&self, reports: Vec<Report>) -> Vec<Report> {
        let mut out: Vec<Report> = reports
            .into_iter()
            .filter(|r| self.status.is_none_or(|s| s == r.status))
            .filter(|r| self.priority.is_none_or(|p| p == r.priority))
            .filter(|r| self.department_id.is_none_or(|d| d == r.department_id))
            .filter(|r| matches_query(self.search.as_deref().unwrap_or_default(), [r.title.as_str()]))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(author: UserId) -> Report {
        Report::create(
            NewReport {
                title: "Generator failure".into(),
                description: Some("  ".into()),
                department_id: DepartmentId::new(),
                priority: ReportPriority::High,
                report_type: ReportType::Incident,
                assigned_to: None,
                attachments: vec![],
                data: serde_json::json!({"site": "north"}),
            },
            author,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn new_reports_are_drafts() {
        let r = draft(UserId::new());
        assert_eq!(r.status, ReportStatus::Draft);
        assert_eq!(r.description, None);
    }

    #[test]
    fn only_author_submits() {
        let author = UserId::new();
        let mut r = draft(author);
        assert_eq!(r.submit(UserId::new(), Utc::now()), Err(DomainError::Unauthorized));
        r.submit(author, Utc::now()).unwrap();
        assert_eq!(r.status, ReportStatus::Pending);
        assert!(r.submitted_at.is_some());
    }

    #[test]
    fn review_flow_and_resubmission() {
        let author = UserId::new();
        let mut r = draft(author);
        r.submit(author, Utc::now()).unwrap();

        assert!(r.review(ReviewDecision::Approve, Utc::now()).is_err());
        r.review(ReviewDecision::StartReview, Utc::now()).unwrap();
        r.review(ReviewDecision::Escalate, Utc::now()).unwrap();
        r.review(ReviewDecision::Reject, Utc::now()).unwrap();
        assert!(r.resolved_at.is_some());

        r.apply(ReportPatch { title: Some("Generator failure (rev 2)".into()), ..Default::default() }, Utc::now())
            .unwrap();
        r.submit(author, Utc::now()).unwrap();
        assert_eq!(r.resolved_at, None);
        r.review(ReviewDecision::StartReview, Utc::now()).unwrap();
        r.review(ReviewDecision::Approve, Utc::now()).unwrap();
        assert_eq!(r.status, ReportStatus::Approved);
        assert!(r.apply(ReportPatch::default(), Utc::now()).is_err());
    }

    #[test]
    fn failed_edit_keeps_report() {
        let mut r = draft(UserId::new());
        let before = r.clone();
        let patch = ReportPatch {
            priority: Some(ReportPriority::Low),
            title: Some(" ".into()),
            ..Default::default()
        };
        assert!(r.apply(patch, Utc::now()).is_err());
        assert_eq!(r, before);
    }

    #[test]
    fn query_filters_and_searches_title() {
        let a = draft(UserId::new());
        let mut b = draft(UserId::new());
        b.title = "Quarterly budget".into();
        b.priority = ReportPriority::Low;

        let q = ReportQuery { search: Some("budget".into()), ..Default::default() };
        assert_eq!(q.apply(vec![a.clone(), b.clone()]).len(), 1);

        let q = ReportQuery { priority: Some(ReportPriority::High), ..Default::default() };
        assert_eq!(q.apply(vec![a, b])[0].title, "Generator failure");
    }
}
