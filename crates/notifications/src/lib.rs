//! Per-user notification inbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DomainError, DomainResult, Entity, NotificationId, UserId, optional_text, require_text,
};

/// Inbox page size.
pub const INBOX_LIMIT: usize = 50;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Ticket,
    Activity,
    Stock,
    Maintenance,
    #[default]
    General,
    Security,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: Option<String>,
    pub kind: NotificationKind,
    /// In-app route the notification points at.
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Notification {
    type Id = NotificationId;
    const KIND: &'static str = "notifications";

    fn id(&self) -> NotificationId {
        self.id
    }
}

/// Notification content, fanned out to one or more recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub link: Option<String>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: None,
            kind,
            link: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// One unread notification per distinct recipient.
    pub fn fan_out(
        &self,
        recipients: impl IntoIterator<Item = UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Notification>> {
        let title = require_text("title", &self.title)?;
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for user_id in recipients {
            if seen.contains(&user_id) {
                continue;
            }
            seen.push(user_id);
            out.push(Notification {
                id: NotificationId::new(),
                user_id,
                title: title.clone(),
                message: optional_text(self.message.clone()),
                kind: self.kind,
                link: optional_text(self.link.clone()),
                read: false,
                created_at: now,
            });
        }
        Ok(out)
    }
}

impl Notification {
    /// Recipients may only touch their own notifications.
    pub fn ensure_owner(&self, user_id: UserId) -> DomainResult<()> {
        if self.user_id != user_id {
            return Err(DomainError::not_found(format!("notification {}", self.id)));
        }
        Ok(())
    }

    pub fn mark_read(&mut self, user_id: UserId) -> DomainResult<bool> {
        self.ensure_owner(user_id)?;
        let changed = !self.read;
        self.read = true;
        Ok(changed)
    }
}

/// Newest notifications for `user_id`, capped at [`INBOX_LIMIT`].
pub fn inbox(all: Vec<Notification>, user_id: UserId) -> Vec<Notification> {
    let mut mine: Vec<Notification> = all.into_iter().filter(|n| n.user_id == user_id).collect();
    mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    mine.truncate(INBOX_LIMIT);
    mine
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn fan_out_skips_duplicate_recipients() {
        let a = UserId::new();
        let b = UserId::new();
        let out = NewNotification::new(NotificationKind::Stock, "Low stock: Gloves")
            .with_message("Quantity dropped to 3")
            .fan_out([a, b, a], Utc::now())
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|n| !n.read && n.kind == NotificationKind::Stock));
    }

    #[test]
    fn blank_title_rejected() {
        let err = NewNotification::new(NotificationKind::General, " ")
            .fan_out([UserId::new()], Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn only_owner_marks_read() {
        let owner = UserId::new();
        let mut n = NewNotification::new(NotificationKind::Ticket, "Ticket updated")
            .fan_out([owner], Utc::now())
            .unwrap()
            .remove(0);
        assert!(n.mark_read(UserId::new()).is_err());
        assert!(!n.read);
        assert!(n.mark_read(owner).unwrap());
        assert!(!n.mark_read(owner).unwrap());
    }

    #[test]
    fn inbox_is_newest_first_and_capped() {
        let me = UserId::new();
        let base = Utc::now();
        let mut all = Vec::new();
        for i in 0..60 {
            let mut n = NewNotification::new(NotificationKind::General, format!("n{i}"))
                .fan_out([me], base + Duration::seconds(i))
                .unwrap()
                .remove(0);
            n.read = i % 2 == 0;
            all.push(n);
        }
        all.extend(
            NewNotification::new(NotificationKind::General, "other")
                .fan_out([UserId::new()], base)
                .unwrap(),
        );

        let mine = inbox(all, me);
        assert_eq!(mine.len(), INBOX_LIMIT);
        assert_eq!(mine[0].title, "n59");
        assert_eq!(unread_count(&mine), 25);
    }
}
