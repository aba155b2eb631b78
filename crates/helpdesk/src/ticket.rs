use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DepartmentId, DomainError, DomainResult, Entity, TicketId, UserId, matches_query,
    optional_text, require_text,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Hardware,
    Software,
    Network,
    Access,
    EquipmentRequest,
    Maintenance,
    #[default]
    Other,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Pending,
    Resolved,
    Closed,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Pending => "pending",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
            TicketStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        match self {
            Open => matches!(next, InProgress | Pending | Resolved | Closed | Cancelled),
            InProgress => matches!(next, Pending | Resolved | Closed | Cancelled),
            Pending => matches!(next, InProgress | Resolved | Closed | Cancelled),
            Resolved => matches!(next, Closed | Open),
            Closed | Cancelled => false,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: TicketId,
    pub ticket_number: String,
    pub title: String,
    pub description: Option<String>,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub requesting_department_id: DepartmentId,
    pub requested_by: UserId,
    pub assigned_to: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for SupportTicket {
    type Id = TicketId;
    const KIND: &'static str = "support_tickets";

    fn id(&self) -> TicketId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.requesting_department_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: TicketCategory,
    #[serde(default)]
    pub priority: TicketPriority,
    pub requesting_department_id: DepartmentId,
}

/// Service-desk update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<UserId>,
}

const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `TKT-YYYYMMDD-XXXX`.
pub fn ticket_number(date: NaiveDate, suffix: &str) -> String {
    format!("TKT-{}-{suffix}", date.format("%Y%m%d"))
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..4)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

impl SupportTicket {
    pub fn open(input: NewTicket, requested_by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: TicketId::new(),
            ticket_number: ticket_number(now.date_naive(), &random_suffix()),
            title: require_text("title", &input.title)?,
            description: optional_text(input.description),
            category: input.category,
            priority: input.priority,
            status: TicketStatus::Open,
            requesting_department_id: input.requesting_department_id,
            requested_by,
            assigned_to: None,
            resolved_at: None,
            resolved_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the previous status when the status moved.
    pub fn apply(
        &mut self,
        patch: TicketPatch,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<TicketStatus>> {
        let previous = self.status;
        let mut moved = None;

        if let Some(next) = patch.status.filter(|s| *s != self.status) {
            if !self.status.can_transition_to(next) {
                return Err(DomainError::conflict(format!(
                    "ticket cannot move from {} to {}",
                    self.status.as_str(),
                    next.as_str()
                )));
            }
            self.status = next;
            if next.is_done() {
                self.resolved_at = Some(now);
                self.resolved_by = Some(actor);
            } else if previous.is_done() {
                self.resolved_at = None;
                self.resolved_by = None;
            }
            moved = Some(previous);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if patch.assigned_to.is_some() {
            self.assigned_to = patch.assigned_to;
        }
        self.updated_at = now;
        Ok(moved)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketQuery {
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub search: Option<String>,
}

impl TicketQuery {
    /// Newest first.
    pub fn apply(&self, tickets: Vec<SupportTicket>) -> Vec<SupportTicket> {
        let mut out: Vec<SupportTicket> = tickets
            .into_iter()
            .filter(|t| self.status.is_none_or(|s| s == t.status))
            .filter(|t| self.priority.is_none_or(|p| p == t.priority))
            .filter(|t| self.department_id.is_none_or(|d| d == t.requesting_department_id))
            .filter(|t| {
                matches_query(
                    self.search.as_deref().unwrap_or_default(),
                    [
                        t.ticket_number.as_str(),
                        t.title.as_str(),
                        t.description.as_deref().unwrap_or_default(),
                    ],
                )
            })
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub pending: usize,
    /// Resolved or closed.
    pub resolved: usize,
    pub critical: usize,
    pub high: usize,
}

pub fn ticket_stats(tickets: &[SupportTicket]) -> TicketStats {
    let mut s = TicketStats {
        total: tickets.len(),
        ..Default::default()
    };
    for t in tickets {
        match t.status {
            TicketStatus::Open => s.open += 1,
            TicketStatus::InProgress => s.in_progress += 1,
            TicketStatus::Pending => s.pending += 1,
            TicketStatus::Resolved | TicketStatus::Closed => s.resolved += 1,
            TicketStatus::Cancelled => {}
        }
        if !t.status.is_done() {
            match t.priority {
                TicketPriority::Critical => s.critical += 1,
                TicketPriority::High => s.high += 1,
                _ => {}
            }
        }
    }
    s
}
