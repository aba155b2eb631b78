//! Field operations feed and the office activity board.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use opsconsole_auth::{
    AppRole, AuthzError, Principal, authorize, authorize_in_department,
    permissions::{OPERATIONS_READ, OPERATIONS_WRITE},
};
use opsconsole_core::{ActivityId, DepartmentId, FieldUpdateId, UserId};
use opsconsole_notifications::{NewNotification, NotificationKind};
use opsconsole_operations::{
    ActivityPatch, ActivityQuery, ActivityStats, ActivityType, FieldUpdate, FieldUpdatePatch,
    FieldUpdateQuery, NewActivity, NewFieldUpdate, OfficeActivity, activity_stats, photo_gallery,
    pinned, today, upcoming, urgent,
};

use super::{Change, ServiceResult, Services, ensure_record_access, target_department};

#[derive(Debug, Clone, Deserialize)]
pub struct PostFieldUpdate {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(flatten)]
    pub update: NewFieldUpdate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleActivity {
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(flatten)]
    pub activity: NewActivity,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldBoard {
    pub urgent: Vec<FieldUpdate>,
    pub pinned: Vec<FieldUpdate>,
    pub gallery: Vec<FieldUpdate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityBoard {
    pub today: Vec<OfficeActivity>,
    pub upcoming: Vec<OfficeActivity>,
    pub stats: ActivityStats,
}

/// Authors and supervisors upward may change a post.
fn ensure_author_or_supervisor(principal: &Principal, created_by: UserId) -> ServiceResult<()> {
    if created_by == principal.user_id || principal.has_min_role(AppRole::Supervisor) {
        Ok(())
    } else {
        Err(AuthzError::policy("Only the author or a supervisor can change this entry").into())
    }
}

impl Services {
    // ── field updates ──────────────────────────────────────────────────────

    async fn visible_field_updates(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
    ) -> ServiceResult<Vec<FieldUpdate>> {
        authorize(principal, &OPERATIONS_READ)?;
        Ok(self
            .scoped(&self.stores.field_updates, principal)
            .await?
            .into_iter()
            .filter(|u| department.is_none_or(|d| u.department_id == d))
            .collect())
    }

    pub async fn list_field_updates(
        &self,
        principal: &Principal,
        query: &FieldUpdateQuery,
    ) -> ServiceResult<Vec<FieldUpdate>> {
        Ok(query.apply(self.visible_field_updates(principal, None).await?))
    }

    pub async fn field_board(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
    ) -> ServiceResult<FieldBoard> {
        let updates = FieldUpdateQuery::default().apply(self.visible_field_updates(principal, department).await?);
        Ok(FieldBoard {
            urgent: urgent(&updates),
            pinned: pinned(&updates),
            gallery: photo_gallery(&updates),
        })
    }

    pub async fn get_field_update(&self, principal: &Principal, id: FieldUpdateId) -> ServiceResult<FieldUpdate> {
        let update = self.stores.field_updates.require(id).await?;
        ensure_record_access(principal, &OPERATIONS_READ, &update)?;
        Ok(update)
    }

    pub async fn post_field_update(
        &self,
        principal: &Principal,
        input: PostFieldUpdate,
    ) -> ServiceResult<FieldUpdate> {
        let department = target_department(principal, input.department_id)?;
        authorize_in_department(principal, &OPERATIONS_WRITE, department)?;
        let update = FieldUpdate::post(department, principal.user_id, input.update, Utc::now())?;
        self.stores.field_updates.insert(update.clone()).await?;
        self.journal(principal, Change::insert(&update)).await;
        Ok(update)
    }

    pub async fn update_field_update(
        &self,
        principal: &Principal,
        id: FieldUpdateId,
        patch: FieldUpdatePatch,
    ) -> ServiceResult<FieldUpdate> {
        let before = self.stores.field_updates.require(id).await?;
        ensure_record_access(principal, &OPERATIONS_WRITE, &before)?;
        ensure_author_or_supervisor(principal, before.created_by)?;
        let mut update = before.clone();
        update.apply(patch, Utc::now())?;
        self.stores.field_updates.update(update.clone()).await?;
        self.journal(principal, Change::update(&before, &update)).await;
        Ok(update)
    }

    pub async fn delete_field_update(&self, principal: &Principal, id: FieldUpdateId) -> ServiceResult<()> {
        let update = self.stores.field_updates.require(id).await?;
        ensure_record_access(principal, &OPERATIONS_WRITE, &update)?;
        ensure_author_or_supervisor(principal, update.created_by)?;
        self.stores.field_updates.delete(id).await?;
        self.journal(principal, Change::delete(&update)).await;
        Ok(())
    }

    // ── office activities ──────────────────────────────────────────────────

    async fn visible_activities(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
    ) -> ServiceResult<Vec<OfficeActivity>> {
        authorize(principal, &OPERATIONS_READ)?;
        Ok(self
            .scoped(&self.stores.activities, principal)
            .await?
            .into_iter()
            .filter(|a| department.is_none_or(|d| a.department_id == d))
            .collect())
    }

    pub async fn list_activities(
        &self,
        principal: &Principal,
        query: &ActivityQuery,
    ) -> ServiceResult<Vec<OfficeActivity>> {
        Ok(query.apply(self.visible_activities(principal, None).await?))
    }

    pub async fn activity_board(
        &self,
        principal: &Principal,
        department: Option<DepartmentId>,
    ) -> ServiceResult<ActivityBoard> {
        let activities = self.visible_activities(principal, department).await?;
        let now = Utc::now();
        Ok(ActivityBoard {
            today: today(&activities, now),
            upcoming: upcoming(&activities, now),
            stats: activity_stats(&activities),
        })
    }

    pub async fn get_activity(&self, principal: &Principal, id: ActivityId) -> ServiceResult<OfficeActivity> {
        let activity = self.stores.activities.require(id).await?;
        ensure_record_access(principal, &OPERATIONS_READ, &activity)?;
        Ok(activity)
    }

    /// Announcements are pushed to everyone in the department.
    pub async fn schedule_activity(
        &self,
        principal: &Principal,
        input: ScheduleActivity,
    ) -> ServiceResult<OfficeActivity> {
        let department = target_department(principal, input.department_id)?;
        authorize_in_department(principal, &OPERATIONS_WRITE, department)?;
        let activity = OfficeActivity::schedule(department, principal.user_id, input.activity, Utc::now())?;
        self.stores.activities.insert(activity.clone()).await?;
        self.journal(principal, Change::insert(&activity)).await;

        if activity.activity_type == ActivityType::Announcement {
            match self.department_members(department, AppRole::Staff).await {
                Ok(members) => {
                    let mut note = NewNotification::new(NotificationKind::Activity, activity.title.clone())
                        .with_link(format!("/operations/activities/{}", activity.id));
                    if let Some(description) = &activity.description {
                        note = note.with_message(description.clone());
                    }
                    self.notify(members.into_iter().filter(|u| *u != principal.user_id), note)
                        .await;
                }
                Err(e) => tracing::warn!(error = %e, "announcement recipients lookup failed"),
            }
        }
        Ok(activity)
    }

    pub async fn update_activity(
        &self,
        principal: &Principal,
        id: ActivityId,
        patch: ActivityPatch,
    ) -> ServiceResult<OfficeActivity> {
        let before = self.stores.activities.require(id).await?;
        ensure_record_access(principal, &OPERATIONS_WRITE, &before)?;
        ensure_author_or_supervisor(principal, before.created_by)?;
        let mut activity = before.clone();
        activity.apply(patch, Utc::now())?;
        self.stores.activities.update(activity.clone()).await?;
        self.journal(principal, Change::update(&before, &activity)).await;
        Ok(activity)
    }

    pub async fn delete_activity(&self, principal: &Principal, id: ActivityId) -> ServiceResult<()> {
        let activity = self.stores.activities.require(id).await?;
        ensure_record_access(principal, &OPERATIONS_WRITE, &activity)?;
        ensure_author_or_supervisor(principal, activity.created_by)?;
        self.stores.activities.delete(id).await?;
        self.journal(principal, Change::delete(&activity)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use opsconsole_operations::{ActivityPriority, ActivityStatus, FieldPriority, FieldStatus};

    use super::*;
    use crate::services::{ServiceError, testing};

    fn field(title: &str, priority: FieldPriority, photos: Vec<String>) -> PostFieldUpdate {
        PostFieldUpdate {
            department_id: None,
            update: NewFieldUpdate {
                title: title.into(),
                description: None,
                location: Some("KM 14".into()),
                status: FieldStatus::Active,
                priority,
                tags: vec!["road".into()],
                photos,
                is_pinned: false,
            },
        }
    }

    fn activity(title: &str, kind: ActivityType, at: Option<chrono::DateTime<Utc>>) -> ScheduleActivity {
        ScheduleActivity {
            department_id: None,
            activity: NewActivity {
                title: title.into(),
                description: Some("details".into()),
                activity_type: kind,
                priority: ActivityPriority::Normal,
                scheduled_at: at,
                attendees: Vec::new(),
                attachments: Vec::new(),
                is_pinned: false,
            },
        }
    }

    #[tokio::test]
    async fn field_board_groups_posts() {
        let services = testing::services();
        let ops = testing::department(&services, "OPS").await;
        let crew = testing::user(&services, "crew@ops.test", AppRole::Staff, Some(ops.id)).await;

        services
            .post_field_update(&crew, field("Washout", FieldPriority::Urgent, Vec::new()))
            .await
            .unwrap();
        services
            .post_field_update(
                &crew,
                field("Paving done", FieldPriority::Normal, vec!["/storage/field-photos/a.jpg".into()]),
            )
            .await
            .unwrap();

        let board = services.field_board(&crew, None).await.unwrap();
        assert_eq!(board.urgent.len(), 1);
        assert_eq!(board.gallery.len(), 1);
        assert!(board.pinned.is_empty());

        let hits = services
            .list_field_updates(
                &crew,
                &FieldUpdateQuery {
                    search: Some("km 14".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn only_authors_and_supervisors_edit() {
        let services = testing::services();
        let ops = testing::department(&services, "OPS").await;
        let author = testing::user(&services, "a@ops.test", AppRole::Staff, Some(ops.id)).await;
        let peer = testing::user(&services, "p@ops.test", AppRole::Staff, Some(ops.id)).await;
        let sup = testing::user(&services, "s@ops.test", AppRole::Supervisor, Some(ops.id)).await;
        let post = services
            .post_field_update(&author, field("Washout", FieldPriority::High, Vec::new()))
            .await
            .unwrap();

        assert!(matches!(
            services.delete_field_update(&peer, post.id).await,
            Err(ServiceError::Authz(AuthzError::Policy(_)))
        ));
        services.delete_field_update(&sup, post.id).await.unwrap();
    }

    #[tokio::test]
    async fn activity_board_and_announcements() {
        let services = testing::services();
        let ops = testing::department(&services, "OPS").await;
        let lead = testing::user(&services, "lead@ops.test", AppRole::Supervisor, Some(ops.id)).await;
        let crew = testing::user(&services, "crew@ops.test", AppRole::Staff, Some(ops.id)).await;

        let later = Utc::now() + Duration::days(3);
        let meeting = services
            .schedule_activity(&lead, activity("Safety briefing", ActivityType::Meeting, Some(later)))
            .await
            .unwrap();
        services
            .schedule_activity(&lead, activity("Office closed Friday", ActivityType::Announcement, None))
            .await
            .unwrap();

        let inbox = services.stores.notifications.list().await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].user_id, crew.user_id);
        assert_eq!(inbox[0].kind, NotificationKind::Activity);

        let done = services
            .update_activity(
                &lead,
                meeting.id,
                ActivityPatch {
                    status: Some(ActivityStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(done.completed_at.is_some());

        let board = services.activity_board(&crew, None).await.unwrap();
        assert_eq!(board.upcoming.len(), 1);
        assert_eq!(board.stats.total, 2);
        assert_eq!(board.stats.completed, 1);
    }
}
