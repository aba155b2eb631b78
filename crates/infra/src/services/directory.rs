//! Authentication, the caller's own profile, and departments.

use chrono::{DateTime, Utc};
use serde::Serialize;

use opsconsole_auth::{
    JwtClaims, Principal, authorize, hash_password, permissions::DEPARTMENTS_MANAGE,
    validate_password_strength, verify_password,
};
use opsconsole_core::{DepartmentId, DomainError, UserId};
use opsconsole_directory::{
    Department, DepartmentPatch, NewDepartment, ProfilePatch, UserAccount, UserProfile,
    normalize_email,
};
use opsconsole_monitoring::{Heartbeat, UserSession};

use super::{Change, ServiceError, ServiceResult, Services};

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub profile: UserProfile,
    pub principal: Principal,
    /// Set while an admin-initiated reset is outstanding; the client must
    /// complete it with `reset_token` before doing anything else.
    pub password_reset_required: bool,
    pub reset_token: Option<String>,
}

const INVALID_LOGIN: &str = "invalid email or password";

impl Services {
    pub(crate) async fn account_by_email(&self, email: &str) -> ServiceResult<Option<UserAccount>> {
        let email = normalize_email(email)?;
        Ok(self
            .stores
            .accounts
            .list()
            .await?
            .into_iter()
            .find(|a| a.email == email))
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let account = match self.account_by_email(email).await {
            Ok(Some(a)) => a,
            Ok(None) | Err(ServiceError::Domain(_)) => {
                return Err(ServiceError::unauthenticated(INVALID_LOGIN));
            }
            Err(e) => return Err(e),
        };
        if !verify_password(password, &account.password_hash)? {
            tracing::info!(user_id = %account.id, "login rejected");
            return Err(ServiceError::unauthenticated(INVALID_LOGIN));
        }

        let now = Utc::now();
        let principal = self.resolve_principal(account.id).await?;
        let (token, claims) =
            self.issuer
                .issue(account.id, &account.email, account.token_generation, now)?;

        let reset_token = if account.must_reset_password {
            self.pending_reset(account.id, now).await?.map(|r| r.token)
        } else {
            None
        };

        let existing = self.stores.sessions.get(UserSession::key(account.id)).await?;
        let session = UserSession::heartbeat(existing, account.id, Heartbeat::default(), now);
        self.stores.sessions.upsert(session.clone()).await?;
        self.publish(&session, opsconsole_events::ChangeAction::Update);

        tracing::info!(user_id = %account.id, "login succeeded");
        Ok(LoginOutcome {
            token,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(now),
            profile: account.profile(),
            principal,
            password_reset_required: account.must_reset_password,
            reset_token,
        })
    }

    /// Principal for a verified bearer token. Tokens minted before the
    /// account's last password reset or change are refused.
    pub async fn authenticate(&self, claims: &JwtClaims) -> ServiceResult<Principal> {
        let account = self.live_account(claims.sub).await?;
        if !account.accepts_token_generation(claims.generation) {
            tracing::info!(user_id = %account.id, "revoked token presented");
            return Err(ServiceError::unauthenticated("token has been revoked"));
        }
        self.principal_for(account).await
    }

    /// Builds the authorization view of a user from the directory: the
    /// account, its role rows and its department grants.
    pub async fn resolve_principal(&self, user_id: UserId) -> ServiceResult<Principal> {
        let account = self.live_account(user_id).await?;
        self.principal_for(account).await
    }

    async fn live_account(&self, user_id: UserId) -> ServiceResult<UserAccount> {
        self.stores
            .accounts
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::unauthenticated("account no longer exists"))
    }

    async fn principal_for(&self, account: UserAccount) -> ServiceResult<Principal> {
        let user_id = account.id;
        let roles = self
            .stores
            .user_roles
            .list()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.assignment())
            .collect();
        let granted = self
            .stores
            .department_access
            .list()
            .await?
            .into_iter()
            .filter(|g| g.user_id == user_id)
            .map(|g| g.department_id)
            .collect();

        Ok(Principal::new(account.id, account.email, roles)
            .with_full_name(account.full_name)
            .with_granted_departments(granted))
    }

    pub async fn profile(&self, principal: &Principal) -> ServiceResult<UserProfile> {
        Ok(self.stores.accounts.require(principal.user_id).await?.profile())
    }

    pub async fn update_profile(
        &self,
        principal: &Principal,
        patch: ProfilePatch,
    ) -> ServiceResult<UserProfile> {
        let read = self.stores.accounts.require_versioned(principal.user_id).await?;
        let before = read.record.clone();
        let expected = read.expected();
        let mut account = read.record;
        account.apply_profile(patch, Utc::now());
        self.stores
            .accounts
            .update_expected(account.clone(), expected)
            .await?;
        self.journal(principal, Change::update(&before, &account).redact("password_hash"))
            .await;
        Ok(account.profile())
    }

    pub async fn change_password(
        &self,
        principal: &Principal,
        current: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        let read = self.stores.accounts.require_versioned(principal.user_id).await?;
        let before = read.record.clone();
        if !verify_password(current, &before.password_hash)? {
            return Err(DomainError::validation("current password is incorrect").into());
        }
        validate_password_strength(new_password)?;

        // Every token, the caller's included, stops working.
        let expected = read.expected();
        let mut account = read.record;
        account.set_password_hash(hash_password(new_password)?, Utc::now());
        self.stores
            .accounts
            .update_expected(account.clone(), expected)
            .await?;
        self.journal(principal, Change::update(&before, &account).redact("password_hash"))
            .await;
        tracing::info!(user_id = %principal.user_id, "password changed");
        Ok(())
    }

    // ── departments ────────────────────────────────────────────────────────

    /// Every authenticated user may read the department list.
    pub async fn list_departments(&self) -> ServiceResult<Vec<Department>> {
        let mut departments = self.stores.departments.list().await?;
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    pub async fn get_department(&self, id: DepartmentId) -> ServiceResult<Department> {
        Ok(self.stores.departments.require(id).await?)
    }

    pub(crate) async fn department_by_code(&self, code: &str) -> ServiceResult<Option<Department>> {
        Ok(self
            .stores
            .departments
            .list()
            .await?
            .into_iter()
            .find(|d| d.code.eq_ignore_ascii_case(code)))
    }

    async fn ensure_code_free(&self, code: &str, except: Option<DepartmentId>) -> ServiceResult<()> {
        if let Some(existing) = self.department_by_code(code).await? {
            if Some(existing.id) != except {
                return Err(DomainError::conflict(format!(
                    "department code '{code}' is already in use"
                ))
                .into());
            }
        }
        Ok(())
    }

    pub async fn create_department(
        &self,
        principal: &Principal,
        input: NewDepartment,
    ) -> ServiceResult<Department> {
        authorize(principal, &DEPARTMENTS_MANAGE)?;
        let department = Department::create(input, Utc::now())?;
        self.ensure_code_free(&department.code, None).await?;
        self.stores.departments.insert(department.clone()).await?;
        self.journal(principal, Change::insert(&department)).await;
        tracing::info!(department_id = %department.id, code = %department.code, "department created");
        Ok(department)
    }

    pub async fn update_department(
        &self,
        principal: &Principal,
        id: DepartmentId,
        patch: DepartmentPatch,
    ) -> ServiceResult<Department> {
        authorize(principal, &DEPARTMENTS_MANAGE)?;
        let before = self.stores.departments.require(id).await?;
        let mut department = before.clone();
        department.apply(patch, Utc::now())?;
        self.ensure_code_free(&department.code, Some(id)).await?;
        self.stores.departments.update(department.clone()).await?;
        self.journal(principal, Change::update(&before, &department)).await;
        Ok(department)
    }

    pub async fn delete_department(&self, principal: &Principal, id: DepartmentId) -> ServiceResult<()> {
        authorize(principal, &DEPARTMENTS_MANAGE)?;
        let department = self.stores.departments.require(id).await?;
        let members = self
            .stores
            .accounts
            .list()
            .await?
            .iter()
            .filter(|a| a.department_id == Some(id))
            .count();
        if members > 0 {
            return Err(DomainError::conflict(format!(
                "department '{}' still has {members} users",
                department.name
            ))
            .into());
        }
        self.stores.departments.delete(id).await?;
        self.journal(principal, Change::delete(&department)).await;
        tracing::info!(department_id = %id, "department deleted");
        Ok(())
    }
}
