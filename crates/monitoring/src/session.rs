use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{Entity, SessionId, UserId};

/// Sessions idle longer than this are swept to inactive.
pub const DEFAULT_IDLE_SECONDS: i64 = 300;

/// Presence row; one per user, keyed by the user's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub session_started: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_active: bool,
    pub current_page: Option<String>,
    pub user_agent: Option<String>,
}

impl Entity for UserSession {
    type Id = SessionId;
    const KIND: &'static str = "user_sessions";

    fn id(&self) -> SessionId {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    #[serde(default)]
    pub current_page: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl UserSession {
    pub fn key(user_id: UserId) -> SessionId {
        SessionId::from_uuid(*user_id.as_uuid())
    }

    /// Upsert semantics: a returning user after an ended session starts a new one.
    pub fn heartbeat(
        existing: Option<UserSession>,
        user_id: UserId,
        beat: Heartbeat,
        now: DateTime<Utc>,
    ) -> UserSession {
        match existing {
            Some(mut s) => {
                if !s.is_active {
                    s.session_started = now;
                }
                s.last_activity = now;
                s.is_active = true;
                if beat.current_page.is_some() {
                    s.current_page = beat.current_page;
                }
                if beat.user_agent.is_some() {
                    s.user_agent = beat.user_agent;
                }
                s
            }
            None => UserSession {
                id: Self::key(user_id),
                user_id,
                session_started: now,
                last_activity: now,
                is_active: true,
                current_page: beat.current_page,
                user_agent: beat.user_agent,
            },
        }
    }

    pub fn end(&mut self) {
        self.is_active = false;
    }

    pub fn is_idle(&self, now: DateTime<Utc>, idle: Duration) -> bool {
        now - self.last_activity > idle
    }
}

/// Marks active-but-idle sessions inactive; returns only the rows that changed.
pub fn sweep_idle(
    sessions: Vec<UserSession>,
    now: DateTime<Utc>,
    idle: Duration,
) -> Vec<UserSession> {
    sessions
        .into_iter()
        .filter(|s| s.is_active && s.is_idle(now, idle))
        .map(|mut s| {
            s.end();
            s
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn heartbeat_upserts_one_row_per_user() {
        let user = UserId::new();
        let t0 = Utc::now();
        let first = UserSession::heartbeat(None, user, Heartbeat { current_page: Some("/fleet".into()), user_agent: None }, t0);
        assert_eq!(first.id, UserSession::key(user));

        let t1 = t0 + Duration::seconds(30);
        let second = UserSession::heartbeat(Some(first.clone()), user, Heartbeat::default(), t1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.session_started, t0);
        assert_eq!(second.last_activity, t1);
        assert_eq!(second.current_page.as_deref(), Some("/fleet"));
    }

    #[test]
    fn heartbeat_after_end_restarts() {
        let user = UserId::new();
        let t0 = Utc::now();
        let mut s = UserSession::heartbeat(None, user, Heartbeat::default(), t0);
        s.end();
        let t1 = t0 + Duration::hours(2);
        let s = UserSession::heartbeat(Some(s), user, Heartbeat::default(), t1);
        assert!(s.is_active);
        assert_eq!(s.session_started, t1);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn sweep_only_touches_idle_active_rows(ages in prop::collection::vec((0i64..900, any::<bool>()), 0..30)) {
            let now = Utc::now();
            let idle = Duration::seconds(DEFAULT_IDLE_SECONDS);
            let sessions: Vec<UserSession> = ages
                .iter()
                .map(|(age, active)| {
                    let mut s = UserSession::heartbeat(None, UserId::new(), Heartbeat::default(), now - Duration::seconds(*age));
                    s.is_active = *active;
                    s
                })
                .collect();
            let expected = ages.iter().filter(|(age, active)| *active && *age > DEFAULT_IDLE_SECONDS).count();
            let swept = sweep_idle(sessions, now, idle);
            prop_assert_eq!(swept.len(), expected);
            prop_assert!(swept.iter().all(|s| !s.is_active));
        }
    }
}
