use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DomainResult, Entity, ReportCommentId, ReportId, UserId, optional_text, require_text,
};

use crate::report::ReviewDecision;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportComment {
    pub id: ReportCommentId,
    pub report_id: ReportId,
    pub user_id: UserId,
    pub content: String,
    /// Workflow action this comment was written with, if any.
    pub action: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for ReportComment {
    type Id = ReportCommentId;
    const KIND: &'static str = "report_comments";

    fn id(&self) -> ReportCommentId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub content: String,
    #[serde(default)]
    pub action: Option<String>,
}

impl ReportComment {
    pub fn post(
        report_id: ReportId,
        user_id: UserId,
        input: NewComment,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: ReportCommentId::new(),
            report_id,
            user_id,
            content: require_text("content", &input.content)?,
            action: optional_text(input.action),
            created_at: now,
        })
    }

    /// Comment recorded alongside a review decision. Falls back to a generated
    /// note when the reviewer left none.
    pub fn for_decision(
        report_id: ReportId,
        user_id: UserId,
        decision: ReviewDecision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let content = optional_text(note)
            .unwrap_or_else(|| format!("Status changed to {}", decision.target().as_str()));
        Self {
            id: ReportCommentId::new(),
            report_id,
            user_id,
            content,
            action: Some(decision.as_str().to_string()),
            created_at: now,
        }
    }
}
