use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{DomainError, DomainResult, Entity, PasswordResetId, UserId};

pub const RESET_TTL_HOURS: i64 = 24;

/// Admin-initiated password reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    pub id: PasswordResetId,
    pub user_id: UserId,
    pub user_email: String,
    pub token: String,
    pub initiated_by: UserId,
    pub initiated_by_name: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Entity for PasswordReset {
    type Id = PasswordResetId;
    const KIND: &'static str = "admin_password_resets";

    fn id(&self) -> PasswordResetId {
        self.id
    }
}

impl PasswordReset {
    pub fn initiate(
        user_id: UserId,
        user_email: impl Into<String>,
        token: String,
        initiated_by: UserId,
        initiated_by_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PasswordResetId::new(),
            user_id,
            user_email: user_email.into(),
            token,
            initiated_by,
            initiated_by_name: initiated_by_name.into(),
            expires_at: now + Duration::hours(RESET_TTL_HOURS),
            is_used: false,
            used_at: None,
            created_at: now,
        }
    }

    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && now < self.expires_at
    }

    /// Consume the token. Used or expired tokens are rejected alike.
    pub fn redeem(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_pending(now) {
            return Err(DomainError::validation("Invalid or expired reset token"));
        }
        self.mark_used(now);
        Ok(())
    }

    /// Retire without redeeming (superseded by a newer reset).
    pub fn mark_used(&mut self, now: DateTime<Utc>) {
        self.is_used = true;
        self.used_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset(now: DateTime<Utc>) -> PasswordReset {
        PasswordReset::initiate(UserId::new(), "u@ops.test", "tok".into(), UserId::new(), "Root", now)
    }

    #[test]
    fn expires_after_a_day() {
        let now = Utc::now();
        let r = reset(now);
        assert!(r.is_pending(now + Duration::hours(23)));
        assert!(!r.is_pending(now + Duration::hours(24)));
    }

    #[test]
    fn redeem_is_single_use() {
        let now = Utc::now();
        let mut r = reset(now);
        r.redeem(now).unwrap();
        assert_eq!(r.used_at, Some(now));
        assert!(r.redeem(now).is_err());
    }

    #[test]
    fn expired_tokens_cannot_be_redeemed() {
        let now = Utc::now();
        let mut r = reset(now);
        assert!(r.redeem(now + Duration::days(2)).is_err());
        assert!(!r.is_used);
    }
}
