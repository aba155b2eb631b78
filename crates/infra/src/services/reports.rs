//! Departmental reports: authoring, submit/review workflow, comments.

use chrono::Utc;
use serde::Deserialize;

use opsconsole_auth::{
    AuthzError, Principal, authorize, authorize_in_department,
    permissions::{REPORTS_READ, REPORTS_REVIEW, REPORTS_WRITE},
};
use opsconsole_core::ReportId;
use opsconsole_notifications::{NewNotification, NotificationKind};
use opsconsole_reports::{
    NewComment, NewReport, Report, ReportComment, ReportPatch, ReportQuery, ReviewDecision,
};

use super::{Change, ServiceResult, Services, ensure_record_access};
use crate::store::WriteBatch;

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub note: Option<String>,
}

impl Services {
    /// Authors edit their own reports; reviewers of the department edit any.
    fn ensure_can_edit_report(&self, principal: &Principal, report: &Report) -> ServiceResult<()> {
        ensure_record_access(principal, &REPORTS_WRITE, report)?;
        if report.created_by != principal.user_id
            && authorize_in_department(principal, &REPORTS_REVIEW, report.department_id).is_err()
        {
            return Err(AuthzError::policy("Only the author or a reviewer can change this report").into());
        }
        Ok(())
    }

    pub async fn list_reports(&self, principal: &Principal, query: &ReportQuery) -> ServiceResult<Vec<Report>> {
        authorize(principal, &REPORTS_READ)?;
        Ok(query.apply(self.scoped(&self.stores.reports, principal).await?))
    }

    pub async fn get_report(&self, principal: &Principal, id: ReportId) -> ServiceResult<Report> {
        let report = self.stores.reports.require(id).await?;
        ensure_record_access(principal, &REPORTS_READ, &report)?;
        Ok(report)
    }

    pub async fn create_report(&self, principal: &Principal, input: NewReport) -> ServiceResult<Report> {
        authorize_in_department(principal, &REPORTS_WRITE, input.department_id)?;
        self.stores.departments.require(input.department_id).await?;
        let report = Report::create(input, principal.user_id, Utc::now())?;
        self.stores.reports.insert(report.clone()).await?;
        self.journal(principal, Change::insert(&report)).await;
        Ok(report)
    }

    pub async fn update_report(
        &self,
        principal: &Principal,
        id: ReportId,
        patch: ReportPatch,
    ) -> ServiceResult<Report> {
        let before = self.stores.reports.require(id).await?;
        self.ensure_can_edit_report(principal, &before)?;
        let mut report = before.clone();
        report.apply(patch, Utc::now())?;
        self.stores.reports.update(report.clone()).await?;
        self.journal(principal, Change::update(&before, &report)).await;
        Ok(report)
    }

    /// Author hands a draft (or a rejected report) in for review.
    pub async fn submit_report(&self, principal: &Principal, id: ReportId) -> ServiceResult<Report> {
        let read = self.stores.reports.require_versioned(id).await?;
        let before = read.record.clone();
        ensure_record_access(principal, &REPORTS_WRITE, &before)?;
        let now = Utc::now();
        let mut report = before.clone();
        report.submit(principal.user_id, now)?;
        let comment = ReportComment::post(
            id,
            principal.user_id,
            NewComment {
                content: "Submitted for review".into(),
                action: Some("submit".into()),
            },
            now,
        )?;

        // A concurrent transition makes this one stale rather than doubling up.
        let mut batch = WriteBatch::new();
        batch.update(&report, read.expected())?;
        batch.insert(&comment)?;
        self.commit(batch).await?;
        self.journal(principal, Change::update(&before, &report)).await;
        self.journal(principal, Change::insert(&comment)).await;
        tracing::info!(report_id = %id, "report submitted");
        Ok(report)
    }

    /// Reviewer decision; leaves a comment with the action and tells the
    /// author.
    pub async fn review_report(
        &self,
        principal: &Principal,
        id: ReportId,
        review: ReviewRequest,
    ) -> ServiceResult<Report> {
        let read = self.stores.reports.require_versioned(id).await?;
        let before = read.record.clone();
        ensure_record_access(principal, &REPORTS_REVIEW, &before)?;
        let now = Utc::now();
        let mut report = before.clone();
        report.review(review.decision, now)?;
        let comment = ReportComment::for_decision(id, principal.user_id, review.decision, review.note, now);

        // A concurrent transition makes this one stale rather than doubling up.
        let mut batch = WriteBatch::new();
        batch.update(&report, read.expected())?;
        batch.insert(&comment)?;
        self.commit(batch).await?;
        self.journal(principal, Change::update(&before, &report)).await;
        self.journal(principal, Change::insert(&comment)).await;
        tracing::info!(
            report_id = %id,
            decision = review.decision.as_str(),
            status = report.status.as_str(),
            "report reviewed"
        );

        if report.created_by != principal.user_id {
            self.notify(
                [report.created_by],
                NewNotification::new(
                    NotificationKind::General,
                    format!("Report {}: {}", report.status.as_str(), report.title),
                )
                .with_message(comment.content.clone())
                .with_link(format!("/reports/{}", report.id)),
            )
            .await;
        }
        Ok(report)
    }

    pub async fn delete_report(&self, principal: &Principal, id: ReportId) -> ServiceResult<()> {
        let report = self.stores.reports.require(id).await?;
        self.ensure_can_edit_report(principal, &report)?;
        let mut batch = WriteBatch::new();
        for comment in self.comments_of(id).await? {
            batch.delete::<ReportComment>(comment.id);
        }
        batch.delete::<Report>(id);
        self.commit(batch).await?;
        self.journal(principal, Change::delete(&report)).await;
        Ok(())
    }

    async fn comments_of(&self, id: ReportId) -> ServiceResult<Vec<ReportComment>> {
        let mut comments: Vec<ReportComment> = self
            .stores
            .report_comments
            .list()
            .await?
            .into_iter()
            .filter(|c| c.report_id == id)
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    /// Thread in posting order.
    pub async fn list_report_comments(
        &self,
        principal: &Principal,
        id: ReportId,
    ) -> ServiceResult<Vec<ReportComment>> {
        self.get_report(principal, id).await?;
        self.comments_of(id).await
    }

    pub async fn add_report_comment(
        &self,
        principal: &Principal,
        id: ReportId,
        input: NewComment,
    ) -> ServiceResult<ReportComment> {
        let report = self.stores.reports.require(id).await?;
        ensure_record_access(principal, &REPORTS_WRITE, &report)?;
        let comment = ReportComment::post(id, principal.user_id, input, Utc::now())?;
        self.stores.report_comments.insert(comment.clone()).await?;
        self.journal(principal, Change::insert(&comment)).await;
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use opsconsole_auth::AppRole;
    use opsconsole_core::DomainError;
    use opsconsole_reports::{ReportPriority, ReportStatus, ReportType};

    use super::*;
    use crate::services::{ServiceError, testing};

    fn draft(department_id: opsconsole_core::DepartmentId) -> NewReport {
        NewReport {
            title: "Monthly diesel usage".into(),
            description: None,
            department_id,
            priority: ReportPriority::Medium,
            report_type: ReportType::Financial,
            assigned_to: None,
            attachments: Vec::new(),
            data: serde_json::json!({ "litres": 4200 }),
        }
    }

    #[tokio::test]
    async fn submit_then_review_to_approval() {
        let services = testing::services();
        let ops = testing::department(&services, "OPS").await;
        let author = testing::user(&services, "a@ops.test", AppRole::Staff, Some(ops.id)).await;
        let boss = testing::user(&services, "m@ops.test", AppRole::Manager, Some(ops.id)).await;

        let report = services.create_report(&author, draft(ops.id)).await.unwrap();
        assert_eq!(report.status, ReportStatus::Draft);

        assert!(matches!(
            services.submit_report(&boss, report.id).await,
            Err(ServiceError::Domain(DomainError::Unauthorized))
        ));
        services.submit_report(&author, report.id).await.unwrap();

        assert!(matches!(
            services
                .review_report(
                    &author,
                    report.id,
                    ReviewRequest {
                        decision: ReviewDecision::StartReview,
                        note: None
                    }
                )
                .await,
            Err(ServiceError::Authz(_))
        ));

        for decision in [ReviewDecision::StartReview, ReviewDecision::Approve] {
            services
                .review_report(&boss, report.id, ReviewRequest { decision, note: None })
                .await
                .unwrap();
        }
        let report = services.get_report(&author, report.id).await.unwrap();
        assert_eq!(report.status, ReportStatus::Approved);
        assert!(report.resolved_at.is_some());

        let actions: Vec<Option<String>> = services
            .list_report_comments(&author, report.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                Some("submit".to_string()),
                Some("start_review".to_string()),
                Some("approve".to_string())
            ]
        );
        let author_notes = services
            .stores
            .notifications
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.user_id == author.user_id)
            .count();
        assert_eq!(author_notes, 2);
    }

    #[tokio::test]
    async fn submitted_reports_are_locked() {
        let services = testing::services();
        let ops = testing::department(&services, "OPS").await;
        let author = testing::user(&services, "a@ops.test", AppRole::Staff, Some(ops.id)).await;
        let report = services.create_report(&author, draft(ops.id)).await.unwrap();
        services.submit_report(&author, report.id).await.unwrap();
        assert!(matches!(
            services
                .update_report(
                    &author,
                    report.id,
                    ReportPatch {
                        title: Some("Edited".into()),
                        ..Default::default()
                    }
                )
                .await,
            Err(ServiceError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn reports_stay_inside_their_department() {
        let services = testing::services();
        let ops = testing::department(&services, "OPS").await;
        let fin = testing::department(&services, "FIN").await;
        let author = testing::user(&services, "a@ops.test", AppRole::Staff, Some(ops.id)).await;
        let outsider = testing::user(&services, "o@ops.test", AppRole::Staff, Some(fin.id)).await;
        let report = services.create_report(&author, draft(ops.id)).await.unwrap();

        assert!(services.list_reports(&outsider, &ReportQuery::default()).await.unwrap().is_empty());
        assert!(matches!(
            services.get_report(&outsider, report.id).await,
            Err(ServiceError::Authz(AuthzError::DepartmentDenied(_)))
        ));
    }
}
