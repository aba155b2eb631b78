use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    ActivityId, DepartmentId, DomainError, DomainResult, Entity, UserId, matches_query,
    optional_text, require_text,
};

pub const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Meeting,
    #[default]
    Task,
    Announcement,
    Update,
    Milestone,
    Event,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeActivity {
    pub id: ActivityId,
    pub department_id: DepartmentId,
    pub created_by: UserId,
    pub title: String,
    pub description: Option<String>,
    pub activity_type: ActivityType,
    pub status: ActivityStatus,
    pub priority: ActivityPriority,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attendees: Vec<String>,
    pub attachments: Vec<String>,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for OfficeActivity {
    type Id = ActivityId;
    const KIND: &'static str = "office_activities";

    fn id(&self) -> ActivityId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub priority: ActivityPriority,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub activity_type: Option<ActivityType>,
    pub status: Option<ActivityStatus>,
    pub priority: Option<ActivityPriority>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub attendees: Option<Vec<String>>,
    pub attachments: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
}

impl OfficeActivity {
    pub fn schedule(
        department_id: DepartmentId,
        created_by: UserId,
        input: NewActivity,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: ActivityId::new(),
            department_id,
            created_by,
            title: require_text("title", &input.title)?,
            description: optional_text(input.description),
            activity_type: input.activity_type,
            status: ActivityStatus::Scheduled,
            priority: input.priority,
            scheduled_at: input.scheduled_at,
            completed_at: None,
            attendees: input.attendees,
            attachments: input.attachments,
            is_pinned: input.is_pinned,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: ActivityPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(title) = patch.title {
            next.title = require_text("title", &title)?;
        }
        if patch.description.is_some() {
            next.description = optional_text(patch.description);
        }
        if let Some(kind) = patch.activity_type {
            next.activity_type = kind;
        }
        if let Some(status) = patch.status {
            if self.status == ActivityStatus::Cancelled && status != ActivityStatus::Cancelled {
                return Err(DomainError::conflict("cancelled activities cannot be reopened"));
            }
            if status == ActivityStatus::Completed && self.status != ActivityStatus::Completed {
                next.completed_at = Some(now);
            } else if status != ActivityStatus::Completed {
                next.completed_at = None;
            }
            next.status = status;
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if patch.scheduled_at.is_some() {
            next.scheduled_at = patch.scheduled_at;
        }
        if let Some(attendees) = patch.attendees {
            next.attendees = attendees;
        }
        if let Some(attachments) = patch.attachments {
            next.attachments = attachments;
        }
        if let Some(pinned) = patch.is_pinned {
            next.is_pinned = pinned;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

/// Pinned first, then by schedule (unscheduled last), then newest first.
pub fn board_order(a: &OfficeActivity, b: &OfficeActivity) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then_with(|| match (a.scheduled_at, b.scheduled_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub activity_type: Option<ActivityType>,
    #[serde(default)]
    pub status: Option<ActivityStatus>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

impl ActivityQuery {
    pub fn apply(&self, activities: Vec<OfficeActivity>) -> Vec<OfficeActivity> {
        let search = self.search.as_deref().unwrap_or_default();
        let mut out: Vec<OfficeActivity> = activities
            .into_iter()
            .filter(|a| self.activity_type.is_none_or(|t| t == a.activity_type))
            .filter(|a| self.status.is_none_or(|s| s == a.status))
            .filter(|a| self.department_id.is_none_or(|d| d == a.department_id))
            .filter(|a| {
                matches_query(
                    search,
                    [a.title.as_str(), a.description.as_deref().unwrap_or_default()],
                )
            })
            .collect();
        out.sort_by(board_order);
        out
    }
}

/// Activities scheduled on the current UTC day.
pub fn today(activities: &[OfficeActivity], now: DateTime<Utc>) -> Vec<OfficeActivity> {
    let day = now.date_naive();
    let mut out: Vec<OfficeActivity> = activities
        .iter()
        .filter(|a| a.scheduled_at.is_some_and(|at| at.date_naive() == day))
        .cloned()
        .collect();
    out.sort_by(board_order);
    out
}

/// Future activities beyond today, soonest first.
pub fn upcoming(activities: &[OfficeActivity], now: DateTime<Utc>) -> Vec<OfficeActivity> {
    let day = now.date_naive();
    let mut out: Vec<OfficeActivity> = activities
        .iter()
        .filter(|a| {
            a.scheduled_at
                .is_some_and(|at| at > now && at.date_naive() != day)
        })
        .cloned()
        .collect();
    out.sort_by_key(|a| a.scheduled_at);
    out.truncate(UPCOMING_LIMIT);
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityStats {
    pub total: usize,
    pub scheduled: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub meetings: usize,
    pub tasks: usize,
}

pub fn activity_stats(activities: &[OfficeActivity]) -> ActivityStats {
    let count = |f: &dyn Fn(&OfficeActivity) -> bool| activities.iter().filter(|a| f(a)).count();
    ActivityStats {
        total: activities.len(),
        scheduled: count(&|a| a.status == ActivityStatus::Scheduled),
        in_progress: count(&|a| a.status == ActivityStatus::InProgress),
        completed: count(&|a| a.status == ActivityStatus::Completed),
        meetings: count(&|a| a.activity_type == ActivityType::Meeting),
        tasks: count(&|a| a.activity_type == ActivityType::Task),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    use super::*;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, 0, 0).unwrap()
    }

    fn activity(title: &str, scheduled_at: Option<DateTime<Utc>>) -> OfficeActivity {
        OfficeActivity::schedule(
            DepartmentId::new(),
            UserId::new(),
            NewActivity {
                title: title.into(),
                description: None,
                activity_type: ActivityType::Meeting,
                priority: ActivityPriority::Normal,
                scheduled_at,
                attendees: vec!["ops@example.com".into()],
                attachments: vec![],
                is_pinned: false,
            },
            at(6),
        )
        .unwrap()
    }

    #[test]
    fn completing_stamps_and_reverting_clears() {
        let mut a = activity("Standup", Some(at(9)));
        let patch = |s| ActivityPatch { status: Some(s), ..Default::default() };
        a.apply(patch(ActivityStatus::Completed), at(10)).unwrap();
        assert_eq!(a.completed_at, Some(at(10)));

        a.apply(patch(ActivityStatus::Completed), at(11)).unwrap();
        assert_eq!(a.completed_at, Some(at(10)));

        a.apply(patch(ActivityStatus::InProgress), at(12)).unwrap();
        assert_eq!(a.completed_at, None);
    }

    #[test]
    fn cancelled_is_final() {
        let mut a = activity("Offsite", None);
        let patch = |s| ActivityPatch { status: Some(s), ..Default::default() };
        a.apply(patch(ActivityStatus::Cancelled), at(7)).unwrap();
        assert!(a.apply(patch(ActivityStatus::Scheduled), at(8)).is_err());
        assert_eq!(a.status, ActivityStatus::Cancelled);
    }

    #[test]
    fn board_order_pins_then_schedule() {
        let mut pinned = activity("pinned", None);
        pinned.is_pinned = true;
        let late = activity("late", Some(at(15)));
        let early = activity("early", Some(at(8)));
        let loose = activity("loose", None);

        let out = ActivityQuery::default().apply(vec![loose, late, pinned, early]);
        let titles: Vec<&str> = out.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["pinned", "early", "late", "loose"]);
    }

    #[test]
    fn today_and_upcoming_views() {
        let now = at(12);
        let all = vec![
            activity("this morning", Some(at(8))),
            activity("this evening", Some(at(18))),
            activity("tomorrow", Some(at(9) + Duration::days(1))),
            activity("last week", Some(at(9) - Duration::days(7))),
            activity("unscheduled", None),
        ];
        let t: Vec<String> = today(&all, now).into_iter().map(|a| a.title).collect();
        assert_eq!(t, ["this morning", "this evening"]);
        let u: Vec<String> = upcoming(&all, now).into_iter().map(|a| a.title).collect();
        assert_eq!(u, ["tomorrow"]);
    }

    #[test]
    fn stats_count_types() {
        let mut task = activity("task", None);
        task.activity_type = ActivityType::Task;
        task.status = ActivityStatus::Completed;
        let s = activity_stats(&[task, activity("m", None)]);
        assert_eq!(s.total, 2);
        assert_eq!(s.meetings, 1);
        assert_eq!(s.tasks, 1);
        assert_eq!(s.completed, 1);
        assert_eq!(s.scheduled, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn scheduled_never_after_unscheduled(
            slots in prop::collection::vec(prop::option::of(0u32..24), 1..20)
        ) {
            let all: Vec<OfficeActivity> = slots
                .iter()
                .enumerate()
                .map(|(i, s)| activity(&format!("a{i}"), s.map(at)))
                .collect();
            let out = ActivityQuery::default().apply(all);
            let first_loose = out.iter().position(|a| a.scheduled_at.is_none()).unwrap_or(out.len());
            prop_assert!(out[first_loose..].iter().all(|a| a.scheduled_at.is_none()));
            prop_assert!(out[..first_loose].windows(2).all(|w| w[0].scheduled_at <= w[1].scheduled_at));
        }
    }
}
