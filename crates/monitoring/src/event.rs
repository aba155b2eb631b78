use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DomainError, DomainResult, Entity, SystemEventId, UserId, optional_text, require_text,
};

pub const EVENT_LIMIT: usize = 100;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub id: SystemEventId,
    pub event_type: String,
    pub severity: Severity,
    pub title: String,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub user_id: Option<UserId>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Entity for SystemEvent {
    type Id = SystemEventId;
    const KIND: &'static str = "system_events";

    fn id(&self) -> SystemEventId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSystemEvent {
    pub event_type: String,
    #[serde(default)]
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl NewSystemEvent {
    pub fn new(event_type: &str, severity: Severity, title: impl Into<String>) -> Self {
        Self {
            event_type: event_type.to_string(),
            severity,
            title: title.into(),
            description: None,
            metadata: serde_json::Value::Null,
        }
    }
}

impl SystemEvent {
    pub fn record(
        input: NewSystemEvent,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: SystemEventId::new(),
            event_type: require_text("event_type", &input.event_type)?,
            severity: input.severity,
            title: require_text("title", &input.title)?,
            description: optional_text(input.description),
            metadata: input.metadata,
            user_id,
            resolved: false,
            resolved_at: None,
            created_at: now,
        })
    }

    pub fn resolve(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.resolved {
            return Err(DomainError::conflict("event is already resolved"));
        }
        self.resolved = true;
        self.resolved_at = Some(now);
        Ok(())
    }
}

/// Newest first, truncated to `limit`.
pub fn recent_events(mut events: Vec<SystemEvent>, limit: usize) -> Vec<SystemEvent> {
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    events.truncate(limit);
    events
}
