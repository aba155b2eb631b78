use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DepartmentId, DomainResult, Entity, FieldUpdateId, UserId, matches_query, optional_text,
    require_text,
};

pub const GALLERY_LIMIT: usize = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    #[default]
    Active,
    InProgress,
    Completed,
    OnHold,
    Issue,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPriority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

/// A post on the field operations feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub id: FieldUpdateId,
    pub department_id: DepartmentId,
    pub created_by: UserId,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: FieldStatus,
    pub priority: FieldPriority,
    pub tags: Vec<String>,
    /// Public blob URLs.
    pub photos: Vec<String>,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for FieldUpdate {
    type Id = FieldUpdateId;
    const KIND: &'static str = "field_updates";

    fn id(&self) -> FieldUpdateId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFieldUpdate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: FieldStatus,
    #[serde(default)]
    pub priority: FieldPriority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdatePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<FieldStatus>,
    pub priority: Option<FieldPriority>,
    pub tags: Option<Vec<String>>,
    pub photos: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

impl FieldUpdate {
    pub fn post(
        department_id: DepartmentId,
        created_by: UserId,
        input: NewFieldUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: FieldUpdateId::new(),
            department_id,
            created_by,
            title: require_text("title", &input.title)?,
            description: optional_text(input.description),
            location: optional_text(input.location),
            status: input.status,
            priority: input.priority,
            tags: clean_tags(input.tags),
            photos: input.photos,
            is_pinned: input.is_pinned,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: FieldUpdatePatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(title) = patch.title {
            next.title = require_text("title", &title)?;
        }
        if patch.description.is_some() {
            next.description = optional_text(patch.description);
        }
        if patch.location.is_some() {
            next.location = optional_text(patch.location);
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(tags) = patch.tags {
            next.tags = clean_tags(tags);
        }
        if let Some(photos) = patch.photos {
            next.photos = photos;
        }
        if let Some(pinned) = patch.is_pinned {
            next.is_pinned = pinned;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    pub fn is_urgent(&self) -> bool {
        self.priority == FieldPriority::Urgent || self.status == FieldStatus::Issue
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdateQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<FieldStatus>,
    #[serde(default)]
    pub priority: Option<FieldPriority>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

impl FieldUpdateQuery {
    pub fn matches(&self, u: &FieldUpdate) -> bool {
        let search = self.search.as_deref().unwrap_or_default();
        self.status.is_none_or(|s| s == u.status)
            && self.priority.is_none_or(|p| p == u.priority)
            && self.department_id.is_none_or(|d| d == u.department_id)
            && matches_query(
                search,
                [
                    u.title.as_str(),
                    u.description.as_deref().unwrap_or_default(),
                    u.location.as_deref().unwrap_or_default(),
                ]
                .into_iter()
                .chain(u.tags.iter().map(String::as_str)),
            )
    }

    /// Pinned first, then newest first.
    pub fn apply(&self, updates: Vec<FieldUpdate>) -> Vec<FieldUpdate> {
        let mut out: Vec<FieldUpdate> = updates.into_iter().filter(|u| self.matches(u)).collect();
        out.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        out
    }
}

pub fn urgent(updates: &[FieldUpdate]) -> Vec<FieldUpdate> {
    updates.iter().filter(|u| u.is_urgent()).cloned().collect()
}

pub fn pinned(updates: &[FieldUpdate]) -> Vec<FieldUpdate> {
    updates.iter().filter(|u| u.is_pinned).cloned().collect()
}

/// Most recent updates carrying photos.
pub fn photo_gallery(updates: &[FieldUpdate]) -> Vec<FieldUpdate> {
    let mut with_photos: Vec<FieldUpdate> =
        updates.iter().filter(|u| !u.photos.is_empty()).cloned().collect();
    with_photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    with_photos.truncate(GALLERY_LIMIT);
    with_photos
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn update(title: &str) -> FieldUpdate {
        FieldUpdate::post(
            DepartmentId::new(),
            UserId::new(),
            NewFieldUpdate {
                title: title.into(),
                description: None,
                location: Some("Pad 7".into()),
                status: FieldStatus::Active,
                priority: FieldPriority::Normal,
                tags: vec![" rig ".into(), "rig".into(), "".into(), "night-shift".into()],
                photos: vec![],
                is_pinned: false,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(update("Pump swap").tags, vec!["rig", "night-shift"]);
    }

    #[test]
    fn search_covers_location_and_tags() {
        let u = update("Pump swap");
        let by_tag = FieldUpdateQuery { search: Some("NIGHT".into()), ..Default::default() };
        let by_loc = FieldUpdateQuery { search: Some("pad 7".into()), ..Default::default() };
        let miss = FieldUpdateQuery { search: Some("crane".into()), ..Default::default() };
        assert!(by_tag.matches(&u));
        assert!(by_loc.matches(&u));
        assert!(!miss.matches(&u));
    }

    #[test]
    fn views() {
        let mut a = update("Leak");
        a.status = FieldStatus::Issue;
        let mut b = update("Road closed");
        b.priority = FieldPriority::Urgent;
        b.is_pinned = true;
        let mut c = update("Progress");
        c.photos = vec!["/storage/field-photos/x.jpg".into()];
        let all = vec![a, b, c];

        assert_eq!(urgent(&all).len(), 2);
        assert_eq!(pinned(&all)[0].title, "Road closed");
        assert_eq!(photo_gallery(&all)[0].title, "Progress");
    }

    #[test]
    fn gallery_keeps_newest() {
        let base = Utc::now();
        let all: Vec<FieldUpdate> = (0..9)
            .map(|i| {
                let mut u = update(&format!("u{i}"));
                u.photos = vec![format!("/storage/field-photos/{i}.jpg")];
                u.created_at = base + Duration::minutes(i);
                u
            })
            .collect();
        let gallery = photo_gallery(&all);
        assert_eq!(gallery.len(), GALLERY_LIMIT);
        assert_eq!(gallery[0].title, "u8");
    }

    #[test]
    fn pinned_sort_first() {
        let base = Utc::now();
        let mut old = update("old");
        old.created_at = base - Duration::days(1);
        old.is_pinned = true;
        let new = update("new");
        let out = FieldUpdateQuery::default().apply(vec![new, old]);
        assert_eq!(out[0].title, "old");
    }
}
