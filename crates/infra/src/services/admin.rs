//! User administration: accounts, role rows, department grants and
//! admin-driven password resets.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_auth::{
    AppRole, ManagedUser, Principal, UserManagementPolicy, generate_reset_token,
    hash_password, validate_password_strength,
};
use opsconsole_core::{DepartmentId, DomainError, ExpectedVersion, PasswordResetId, UserId};
use opsconsole_directory::{
    DepartmentAccess, NewUserAccount, PasswordReset, ProfilePatch, UserAccount, UserProfile,
    UserRole,
};
use opsconsole_events::ChangeAction;
use opsconsole_monitoring::{AuditAction, UserSession};
use opsconsole_notifications::{NewNotification, NotificationKind};

use super::{Change, ServiceError, ServiceResult, Services};
use crate::store::{Versioned, WriteBatch};

/// A user as the admin screens see it.
#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub role: AppRole,
    pub role_department_id: Option<DepartmentId>,
    pub granted_departments: Vec<DepartmentId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: AppRole,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

fn default_role() -> AppRole {
    AppRole::Staff
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<AppRole>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetIssued {
    pub reset_id: PasswordResetId,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl Services {
    async fn role_row(&self, user_id: UserId) -> ServiceResult<Option<UserRole>> {
        Ok(self
            .stores
            .user_roles
            .list()
            .await?
            .into_iter()
            .find(|r| r.user_id == user_id))
    }

    async fn managed_user(
        &self,
        user_id: UserId,
    ) -> ServiceResult<(Versioned<UserAccount>, Option<UserRole>, ManagedUser)> {
        let account = self.stores.accounts.require_versioned(user_id).await?;
        let role = self.role_row(user_id).await?;
        let managed = ManagedUser {
            user_id,
            role: role.as_ref().map(|r| r.role).unwrap_or(AppRole::Staff),
            department_id: role
                .as_ref()
                .and_then(|r| r.department_id)
                .or(account.record.department_id),
        };
        Ok((account, role, managed))
    }

    pub(crate) async fn pending_reset(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<PasswordReset>> {
        Ok(self
            .stores
            .password_resets
            .list()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id && r.is_pending(now))
            .max_by_key(|r| r.created_at))
    }

    pub async fn list_users(&self, principal: &Principal) -> ServiceResult<Vec<UserOverview>> {
        let policy = UserManagementPolicy::for_actor(principal)?;
        let roles = self.stores.user_roles.list().await?;
        let grants = self.stores.department_access.list().await?;

        let mut out: Vec<UserOverview> = self
            .stores
            .accounts
            .list()
            .await?
            .into_iter()
            .map(|account| {
                let role = roles.iter().find(|r| r.user_id == account.id);
                UserOverview {
                    role: role.map(|r| r.role).unwrap_or(AppRole::Staff),
                    role_department_id: role.and_then(|r| r.department_id),
                    granted_departments: grants
                        .iter()
                        .filter(|g| g.user_id == account.id)
                        .map(|g| g.department_id)
                        .collect(),
                    profile: account.profile(),
                }
            })
            .filter(|u| {
                principal.is_super_admin()
                    || policy.admin_department().is_some_and(|d| {
                        u.profile.department_id == Some(d) || u.role_department_id == Some(d)
                    })
            })
            .collect();
        out.sort_by(|a, b| a.profile.email.cmp(&b.profile.email));
        Ok(out)
    }

    pub async fn create_user(&self, principal: &Principal, input: CreateUser) -> ServiceResult<UserProfile> {
        let policy = UserManagementPolicy::for_actor(principal)?;
        policy.ensure_can_create(input.role, input.department_id)?;
        validate_password_strength(&input.password)?;
        if let Some(department) = input.department_id {
            self.stores.departments.require(department).await?;
        }
        if self.account_by_email(&input.email).await?.is_some() {
            return Err(DomainError::conflict("a user with this email already exists").into());
        }

        let now = Utc::now();
        let account = UserAccount::create(
            NewUserAccount {
                email: input.email,
                password_hash: hash_password(&input.password)?,
                full_name: input.full_name,
                department_id: input.department_id,
                role: input.role,
            },
            now,
        )?;
        let role = UserRole::new(account.id, input.role, input.department_id, now);

        let mut batch = WriteBatch::new();
        batch.insert(&account)?;
        batch.insert(&role)?;
        self.commit(batch).await?;
        self.journal(principal, Change::insert(&account).redact("password_hash")).await;
        self.journal(principal, Change::insert(&role)).await;
        tracing::info!(user_id = %account.id, role = role.role.as_str(), "user created");
        Ok(account.profile())
    }

    pub async fn update_user(
        &self,
        principal: &Principal,
        user_id: UserId,
        input: UpdateUser,
    ) -> ServiceResult<UserProfile> {
        let policy = UserManagementPolicy::for_actor(principal)?;
        let (read, role_before, managed) = self.managed_user(user_id).await?;
        policy.ensure_can_manage(&managed)?;
        let before = read.record.clone();
        if let Some(role) = input.role {
            policy.ensure_can_assign_role(role)?;
        }
        if let Some(department) = input.department_id {
            policy.ensure_can_assign_department(Some(department))?;
            self.stores.departments.require(department).await?;
        }

        let now = Utc::now();
        let mut account = before.clone();
        if input.full_name.is_some() {
            account.apply_profile(
                ProfilePatch {
                    full_name: input.full_name,
                    ..Default::default()
                },
                now,
            );
        }
        if let Some(department) = input.department_id {
            account.department_id = Some(department);
            account.updated_at = now;
        }

        let role_after = match role_before.clone() {
            Some(mut row) => {
                row.role = input.role.unwrap_or(row.role);
                row.department_id = input.department_id.or(row.department_id);
                row
            }
            None => UserRole::new(
                user_id,
                input.role.unwrap_or(AppRole::Staff),
                account.department_id,
                now,
            ),
        };

        let mut batch = WriteBatch::new();
        batch.update(&account, read.expected())?;
        batch.upsert(&role_after)?;
        self.commit(batch).await?;
        self.journal(principal, Change::update(&before, &account).redact("password_hash"))
            .await;
        let role_change = match &role_before {
            Some(prev) => Change::update(prev, &role_after),
            None => Change::insert(&role_after),
        };
        self.journal(principal, role_change).await;
        tracing::info!(%user_id, "user updated");
        Ok(account.profile())
    }

    pub async fn delete_user(&self, principal: &Principal, user_id: UserId) -> ServiceResult<()> {
        let policy = UserManagementPolicy::for_actor(principal)?;
        let (account, role, managed) = self.managed_user(user_id).await?;
        policy.ensure_can_delete(&managed)?;

        let grants: Vec<DepartmentAccess> = self
            .stores
            .department_access
            .list()
            .await?
            .into_iter()
            .filter(|g| g.user_id == user_id)
            .collect();

        let mut batch = WriteBatch::new();
        batch.delete::<UserAccount>(user_id);
        if let Some(role) = &role {
            batch.delete::<UserRole>(role.id);
        }
        for grant in &grants {
            batch.delete::<DepartmentAccess>(grant.id);
        }
        batch.delete::<UserSession>(UserSession::key(user_id));
        self.commit(batch).await?;

        self.journal(principal, Change::delete(&account.record).redact("password_hash"))
            .await;
        tracing::info!(%user_id, "user deleted");
        Ok(())
    }

    // ── department access ──────────────────────────────────────────────────

    async fn grants_of(&self, user_id: UserId) -> ServiceResult<Vec<DepartmentAccess>> {
        Ok(self
            .stores
            .department_access
            .list()
            .await?
            .into_iter()
            .filter(|g| g.user_id == user_id)
            .collect())
    }

    pub async fn list_department_access(
        &self,
        principal: &Principal,
        user_id: UserId,
    ) -> ServiceResult<Vec<DepartmentAccess>> {
        let policy = UserManagementPolicy::for_actor(principal)?;
        if user_id != principal.user_id {
            let (_, _, managed) = self.managed_user(user_id).await?;
            policy.ensure_can_manage(&managed)?;
        }
        self.grants_of(user_id).await
    }

    pub async fn grant_department_access(
        &self,
        principal: &Principal,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> ServiceResult<DepartmentAccess> {
        UserManagementPolicy::for_actor(principal)?.ensure_can_manage_department_access()?;
        self.stores.accounts.require(user_id).await?;
        self.stores.departments.require(department_id).await?;
        if self
            .grants_of(user_id)
            .await?
            .iter()
            .any(|g| g.department_id == department_id)
        {
            return Err(DomainError::conflict("user already has access to this department").into());
        }

        let grant = DepartmentAccess::grant(user_id, department_id, principal.user_id, Utc::now());
        self.stores.department_access.insert(grant.clone()).await?;
        self.journal(principal, Change::insert(&grant)).await;
        Ok(grant)
    }

    pub async fn revoke_department_access(
        &self,
        principal: &Principal,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> ServiceResult<()> {
        UserManagementPolicy::for_actor(principal)?.ensure_can_manage_department_access()?;
        let grant = self
            .grants_of(user_id)
            .await?
            .into_iter()
            .find(|g| g.department_id == department_id)
            .ok_or_else(|| ServiceError::not_found(format!("department access {department_id}")))?;
        self.stores.department_access.delete(grant.id).await?;
        self.journal(principal, Change::delete(&grant)).await;
        Ok(())
    }

    /// Make the user's grants exactly `departments`.
    pub async fn replace_department_access(
        &self,
        principal: &Principal,
        user_id: UserId,
        departments: Vec<DepartmentId>,
    ) -> ServiceResult<Vec<DepartmentAccess>> {
        UserManagementPolicy::for_actor(principal)?.ensure_can_manage_department_access()?;
        self.stores.accounts.require(user_id).await?;
        let wanted: BTreeSet<DepartmentId> = departments.into_iter().collect();
        for department in &wanted {
            self.stores.departments.require(*department).await?;
        }

        let current = self.grants_of(user_id).await?;
        let removed: Vec<&DepartmentAccess> = current
            .iter()
            .filter(|g| !wanted.contains(&g.department_id))
            .collect();
        let now = Utc::now();
        let added: Vec<DepartmentAccess> = wanted
            .iter()
            .filter(|d| !current.iter().any(|g| g.department_id == **d))
            .map(|d| DepartmentAccess::grant(user_id, *d, principal.user_id, now))
            .collect();

        let mut batch = WriteBatch::new();
        for grant in &removed {
            batch.delete::<DepartmentAccess>(grant.id);
        }
        for grant in &added {
            batch.insert(grant)?;
        }
        self.commit(batch).await?;

        for grant in removed {
            self.journal(principal, Change::delete(grant)).await;
        }
        for grant in &added {
            self.journal(principal, Change::insert(grant)).await;
        }
        self.grants_of(user_id).await
    }

    // ── password resets ────────────────────────────────────────────────────

    /// Force a reset: retire older reset tokens, flag the account, revoke
    /// every session token it holds and tell the user.
    pub async fn initiate_password_reset(
        &self,
        principal: &Principal,
        user_id: UserId,
    ) -> ServiceResult<ResetIssued> {
        UserManagementPolicy::for_actor(principal)?.ensure_can_reset_passwords()?;
        let read = self.stores.accounts.require_versioned(user_id).await?;
        let before = read.record.clone();
        let now = Utc::now();
        let mut batch = WriteBatch::new();

        let older: Vec<PasswordReset> = self
            .stores
            .password_resets
            .list()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id && r.is_pending(now))
            .collect();
        for mut reset in older {
            reset.mark_used(now);
            batch.update(&reset, ExpectedVersion::Any)?;
        }

        let reset = PasswordReset::initiate(
            user_id,
            before.email.clone(),
            generate_reset_token(),
            principal.user_id,
            principal.display_name(),
            now,
        );
        batch.insert(&reset)?;

        let expected = read.expected();
        let mut account = read.record;
        account.must_reset_password = true;
        account.revoke_tokens(now);
        batch.update(&account, expected)?;

        let session = match self.stores.sessions.get(UserSession::key(user_id)).await? {
            Some(mut session) => {
                session.end();
                batch.update(&session, ExpectedVersion::Any)?;
                Some(session)
            }
            None => None,
        };
        self.commit(batch).await?;

        if let Some(session) = &session {
            self.publish(session, ChangeAction::Update);
        }

        self.journal(principal, Change::insert(&reset).redact("token")).await;
        self.journal(principal, Change::update(&before, &account).redact("password_hash"))
            .await;
        self.notify(
            [user_id],
            NewNotification::new(NotificationKind::Security, "Password Reset Required")
                .with_message(
                    "Your password has been reset by an administrator. Please log in to set a new password.",
                ),
        )
        .await;
        tracing::info!(%user_id, initiated_by = %principal.user_id, "password reset initiated");

        Ok(ResetIssued {
            reset_id: reset.id,
            user_id,
            expires_at: reset.expires_at,
        })
    }

    /// Redeem a reset token. Unauthenticated: the token is the credential.
    pub async fn complete_password_reset(&self, token: &str, new_password: &str) -> ServiceResult<()> {
        validate_password_strength(new_password)?;
        let now = Utc::now();
        let mut reset = self
            .stores
            .password_resets
            .list()
            .await?
            .into_iter()
            .find(|r| r.token == token)
            .ok_or_else(|| DomainError::validation("Invalid or expired reset token"))?;
        reset.redeem(now)?;

        let read = self.stores.accounts.require_versioned(reset.user_id).await?;
        let before = read.record.clone();
        let expected = read.expected();
        let mut account = read.record;
        account.set_password_hash(hash_password(new_password)?, now);

        let mut batch = WriteBatch::new();
        batch.update(&reset, ExpectedVersion::Any)?;
        batch.update(&account, expected)?;
        self.commit(batch).await?;

        let owner = self.resolve_principal(account.id).await?;
        self.journal(
            &owner,
            Change::update(&before, &account)
                .with_action(AuditAction::PasswordReset)
                .redact("password_hash"),
        )
        .await;
        self.notify(
            [account.id],
            NewNotification::new(NotificationKind::Security, "Password Updated Successfully")
                .with_message(
                    "Your password has been changed. You can now log in with your new password.",
                ),
        )
        .await;
        tracing::info!(user_id = %account.id, "password reset completed");
        Ok(())
    }

    pub async fn set_user_password(
        &self,
        principal: &Principal,
        user_id: UserId,
        new_password: &str,
    ) -> ServiceResult<()> {
        UserManagementPolicy::for_actor(principal)?.ensure_can_reset_passwords()?;
        validate_password_strength(new_password)?;
        let read = self.stores.accounts.require_versioned(user_id).await?;
        let before = read.record.clone();
        let expected = read.expected();
        let mut account = read.record;
        account.set_password_hash(hash_password(new_password)?, Utc::now());
        self.stores
            .accounts
            .update_expected(account.clone(), expected)
            .await?;

        self.journal(
            principal,
            Change::update(&before, &account)
                .with_action(AuditAction::PasswordReset)
                .redact("password_hash"),
        )
        .await;
        self.notify(
            [user_id],
            NewNotification::new(NotificationKind::Security, "Password Changed").with_message(
                format!(
                    "Your password has been reset by an administrator ({}). Please contact them to receive your new password.",
                    principal.display_name()
                ),
            ),
        )
        .await;
        tracing::info!(%user_id, set_by = %principal.user_id, "password set by admin");
        Ok(())
    }

    /// Seed the first super_admin. No-op once any super_admin exists.
    pub async fn bootstrap_super_admin(
        &self,
        email: &str,
        password: &str,
    ) -> ServiceResult<Option<UserProfile>> {
        let exists = self
            .stores
            .user_roles
            .list()
            .await?
            .iter()
            .any(|r| r.role == AppRole::SuperAdmin);
        if exists {
            return Ok(None);
        }
        validate_password_strength(password)?;
        if self.account_by_email(email).await?.is_some() {
            return Err(DomainError::conflict("bootstrap email already belongs to a user").into());
        }

        let now = Utc::now();
        let account = UserAccount::create(
            NewUserAccount {
                email: email.to_string(),
                password_hash: hash_password(password)?,
                full_name: Some("Super Admin".to_string()),
                department_id: None,
                role: AppRole::SuperAdmin,
            },
            now,
        )?;
        let mut batch = WriteBatch::new();
        batch.insert(&account)?;
        batch.insert(&UserRole::new(account.id, AppRole::SuperAdmin, None, now))?;
        self.commit(batch).await?;
        tracing::info!(user_id = %account.id, email = %account.email, "bootstrap super_admin created");
        Ok(Some(account.profile()))
    }
}

#[cfg(test)]
mod tests {
    use opsconsole_auth::AuthzError;

    use super::*;
    use crate::services::testing::{self, PASSWORD};

    fn new_user(email: &str, role: AppRole, department_id: Option<DepartmentId>) -> CreateUser {
        CreateUser {
            email: email.into(),
            password: PASSWORD.into(),
            full_name: Some("New User".into()),
            role,
            department_id,
        }
    }

    #[tokio::test]
    async fn admins_are_confined_to_their_department() {
        let services = testing::services();
        let wh = testing::department(&services, "WH").await;
        let flt = testing::department(&services, "FLT").await;
        let admin = testing::user(&services, "admin@ops.test", AppRole::Admin, Some(wh.id)).await;

        services
            .create_user(&admin, new_user("w@ops.test", AppRole::Supervisor, Some(wh.id)))
            .await
            .unwrap();
        assert!(matches!(
            services
                .create_user(&admin, new_user("f@ops.test", AppRole::Staff, Some(flt.id)))
                .await,
            Err(ServiceError::Authz(AuthzError::Policy(_)))
        ));
        assert!(matches!(
            services
                .create_user(&admin, new_user("a2@ops.test", AppRole::Admin, Some(wh.id)))
                .await,
            Err(ServiceError::Authz(AuthzError::Policy(_)))
        ));

        let visible = services.list_users(&admin).await.unwrap();
        let emails: Vec<&str> = visible.iter().map(|u| u.profile.email.as_str()).collect();
        assert_eq!(emails, vec!["admin@ops.test", "w@ops.test"]);
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let services = testing::services();
        let root = testing::user(&services, "root@ops.test", AppRole::SuperAdmin, None).await;
        services.create_user(&root, new_user("x@ops.test", AppRole::Staff, None)).await.unwrap();
        assert!(matches!(
            services.create_user(&root, new_user("X@OPS.test", AppRole::Staff, None)).await,
            Err(ServiceError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn update_user_moves_role_row() {
        let services = testing::services();
        let wh = testing::department(&services, "WH").await;
        let root = testing::user(&services, "root@ops.test", AppRole::SuperAdmin, None).await;
        let target = testing::user(&services, "t@ops.test", AppRole::Staff, None).await;

        services
            .update_user(
                &root,
                target.user_id,
                UpdateUser {
                    role: Some(AppRole::Manager),
                    department_id: Some(wh.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let p = services.resolve_principal(target.user_id).await.unwrap();
        assert_eq!(p.highest_role(), AppRole::Manager);
        assert_eq!(p.primary_department(), Some(wh.id));
    }

    #[tokio::test]
    async fn nobody_deletes_themselves() {
        let services = testing::services();
        let root = testing::user(&services, "root@ops.test", AppRole::SuperAdmin, None).await;
        assert!(matches!(
            services.delete_user(&root, root.user_id).await,
            Err(ServiceError::Domain(DomainError::Validation(_)))
        ));

        let other = testing::user(&services, "o@ops.test", AppRole::Staff, None).await;
        services.delete_user(&root, other.user_id).await.unwrap();
        assert!(services.stores.accounts.get(other.user_id).await.unwrap().is_none());
        assert!(services.role_row(other.user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn department_grants_are_super_admin_only_and_unique() {
        let services = testing::services();
        let wh = testing::department(&services, "WH").await;
        let flt = testing::department(&services, "FLT").await;
        let root = testing::user(&services, "root@ops.test", AppRole::SuperAdmin, None).await;
        let admin = testing::user(&services, "admin@ops.test", AppRole::Admin, Some(wh.id)).await;
        let user = testing::user(&services, "u@ops.test", AppRole::Staff, Some(wh.id)).await;

        assert!(matches!(
            services.grant_department_access(&admin, user.user_id, flt.id).await,
            Err(ServiceError::Authz(_))
        ));
        services.grant_department_access(&root, user.user_id, flt.id).await.unwrap();
        assert!(matches!(
            services.grant_department_access(&root, user.user_id, flt.id).await,
            Err(ServiceError::Domain(DomainError::Conflict(_)))
        ));

        let grants = services
            .replace_department_access(&root, user.user_id, vec![wh.id, wh.id])
            .await
            .unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].department_id, wh.id);

        services.revoke_department_access(&root, user.user_id, wh.id).await.unwrap();
        assert!(services.grants_of(user.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_flow_round_trip() {
        let services = testing::services();
        let root = testing::user(&services, "root@ops.test", AppRole::SuperAdmin, None).await;
        let user = testing::user(&services, "u@ops.test", AppRole::Staff, None).await;

        let first = services.initiate_password_reset(&root, user.user_id).await.unwrap();
        let second = services.initiate_password_reset(&root, user.user_id).await.unwrap();
        assert_ne!(first.reset_id, second.reset_id);

        let login = services.login("u@ops.test", PASSWORD).await.unwrap();
        assert!(login.password_reset_required);
        let token = login.reset_token.expect("pending reset token");

        let old = services.stores.password_resets.require(first.reset_id).await.unwrap();
        assert!(old.is_used, "older reset is retired");

        services.complete_password_reset(&token, "Fr3sh-Passw0rd!").await.unwrap();
        assert!(matches!(
            services.complete_password_reset(&token, "Fr3sh-Passw0rd!").await,
            Err(ServiceError::Domain(DomainError::Validation(_)))
        ));

        let login = services.login("u@ops.test", "Fr3sh-Passw0rd!").await.unwrap();
        assert!(!login.password_reset_required);

        let security = services
            .stores
            .notifications
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.user_id == user.user_id && n.kind == NotificationKind::Security)
            .count();
        assert_eq!(security, 3);
    }

    #[tokio::test]
    async fn direct_set_is_audited_as_password_reset() {
        let services = testing::services();
        let root = testing::user(&services, "root@ops.test", AppRole::SuperAdmin, None).await;
        let admin = testing::user(&services, "admin@ops.test", AppRole::Admin, None).await;
        let user = testing::user(&services, "u@ops.test", AppRole::Staff, None).await;

        assert!(services.set_user_password(&admin, user.user_id, "N3w-Passw0rd!").await.is_err());
        services.set_user_password(&root, user.user_id, "N3w-Passw0rd!").await.unwrap();

        let logs = services.stores.audit_logs.list().await.unwrap();
        let log = logs
            .iter()
            .find(|l| l.action == AuditAction::PasswordReset)
            .unwrap();
        assert_eq!(log.user_id, root.user_id);
        assert!(log.new_data.as_ref().unwrap().get("password_hash").is_none());
    }

    #[tokio::test]
    async fn bootstrap_runs_once() {
        let services = testing::services();
        assert!(services
            .bootstrap_super_admin("root@ops.test", PASSWORD)
            .await
            .unwrap()
            .is_some());
        assert!(services
            .bootstrap_super_admin("other@ops.test", PASSWORD)
            .await
            .unwrap()
            .is_none());
    }
}
