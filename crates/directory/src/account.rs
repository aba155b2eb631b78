use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_auth::AppRole;
use opsconsole_core::{DepartmentId, DomainError, DomainResult, Entity, UserId, optional_text};

/// A login-capable user. `password_hash` never leaves the service layer;
/// callers see [`UserProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub must_reset_password: bool,
    /// Bumped whenever outstanding sessions must stop working. Issued tokens
    /// carry the value they were minted under.
    #[serde(default)]
    pub token_generation: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for UserAccount {
    type Id = UserId;
    const KIND: &'static str = "profiles";

    fn id(&self) -> UserId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        self.department_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub must_reset_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for admin-created accounts. The password arrives already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserAccount {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub role: AppRole,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("email must be a valid address"));
    }
    Ok(email)
}

impl UserAccount {
    pub fn create(input: NewUserAccount, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: UserId::new(),
            email: normalize_email(&input.email)?,
            password_hash: input.password_hash,
            full_name: optional_text(input.full_name),
            phone: None,
            avatar_url: None,
            department_id: input.department_id,
            must_reset_password: false,
            token_generation: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            avatar_url: self.avatar_url.clone(),
            department_id: self.department_id,
            must_reset_password: self.must_reset_password,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }

    pub fn apply_profile(&mut self, patch: ProfilePatch, now: DateTime<Utc>) {
        if patch.full_name.is_some() {
            self.full_name = optional_text(patch.full_name);
        }
        if patch.phone.is_some() {
            self.phone = optional_text(patch.phone);
        }
        if patch.avatar_url.is_some() {
            self.avatar_url = optional_text(patch.avatar_url);
        }
        self.updated_at = now;
    }

    /// Replaces the credential and signs out every existing token.
    pub fn set_password_hash(&mut self, hash: String, now: DateTime<Utc>) {
        self.password_hash = hash;
        self.must_reset_password = false;
        self.revoke_tokens(now);
    }

    pub fn revoke_tokens(&mut self, now: DateTime<Utc>) {
        self.token_generation = self.token_generation.wrapping_add(1);
        self.updated_at = now;
    }

    /// Whether a token minted under `generation` is still honoured.
    pub fn accepts_token_generation(&self, generation: u32) -> bool {
        generation == self.token_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_lower_cased() {
        assert_eq!(normalize_email(" Jane@Ops.Test ").unwrap(), "jane@ops.test");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@ops.test").is_err());
        assert!(normalize_email("a@b@c").is_err());
    }

    #[test]
    fn profile_hides_password_hash() {
        let acc = UserAccount::create(
            NewUserAccount {
                email: "a@ops.test".into(),
                password_hash: "$argon2id$...".into(),
                full_name: Some("  ".into()),
                department_id: None,
                role: AppRole::Staff,
            },
            Utc::now(),
        )
        .unwrap();
        let json = serde_json::to_string(&acc.profile()).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(acc.full_name, None);
        assert_eq!(acc.display_name(), "a@ops.test");
    }

    #[test]
    fn setting_a_password_clears_the_reset_flag() {
        let now = Utc::now();
        let mut acc = UserAccount::create(
            NewUserAccount {
                email: "a@ops.test".into(),
                password_hash: "old".into(),
                full_name: None,
                department_id: None,
                role: AppRole::Staff,
            },
            now,
        )
        .unwrap();
        acc.must_reset_password = true;
        acc.set_password_hash("new".into(), now);
        assert!(!acc.must_reset_password);
        assert_eq!(acc.password_hash, "new");
        assert!(!acc.accepts_token_generation(0));
        assert!(acc.accepts_token_generation(1));
    }
}
