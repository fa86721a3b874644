// ============================================================================
// CRM Core - Authentication Service
// File: crates/crm-core/src/services/auth_service.rs
// ============================================================================
//! Login for central administrators and tenant users

use std::sync::Arc;

use chrono::Utc;
use crm_security::jwt::JwtService;
use crm_security::password::{PasswordPolicy, PasswordService};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{effective_permissions, CentralUser};
use crate::error::DomainError;
use crate::repositories::{CentralUserRepository, RoleRepository, UserRepository};

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: UserInfo,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// User info returned in auth responses
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

fn check_password(password: &str, hash: &str, email: &str) -> Result<(), DomainError> {
    let valid = PasswordService::verify(password, hash).map_err(|e| {
        error!("Stored password hash unreadable for {}: {}", email, e);
        DomainError::InvalidCredentials
    })?;
    if !valid {
        warn!("Login failed: invalid password for: {}", email);
        return Err(DomainError::InvalidCredentials);
    }
    Ok(())
}

/// Landlord administrators
pub struct CentralAuthService<U: CentralUserRepository> {
    user_repo: Arc<U>,
    jwt: Arc<JwtService>,
}

impl<U: CentralUserRepository> CentralAuthService<U> {
    pub fn new(user_repo: Arc<U>, jwt: Arc<JwtService>) -> Self {
        Self { user_repo, jwt }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, DomainError> {
        let email = email.trim().to_lowercase();
        info!("Central login attempt for email: {}", crm_shared::utils::mask_email(&email));

        let user = self.user_repo.find_by_email(&email).await?.ok_or_else(|| {
            warn!("Login failed: email not found");
            DomainError::InvalidCredentials
        })?;
        if !user.is_active {
            return Err(DomainError::UserNotActive);
        }
        check_password(password, &user.password_hash, &email)?;

        let access_token = self
            .jwt
            .generate_central_token(&user.id)
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))?;

        if let Err(e) = self.user_repo.record_login(&user.id, Utc::now()).await {
            error!("Failed to update last login: {}", e);
        }

        Ok(LoginResult {
            user: UserInfo {
                id: user.id,
                name: user.name,
                email: user.email,
                permissions: Vec::new(),
            },
            access_token,
            token_type: "Bearer",
            expires_in: self.jwt.expiry_seconds(),
        })
    }

    /// Creates the first administrator when the central database has none.
    /// Returns `None` when an administrator already exists.
    pub async fn bootstrap_super_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<CentralUser>, DomainError> {
        if self.user_repo.count().await? > 0 {
            return Ok(None);
        }
        PasswordPolicy::check(password, &[email, name])?;
        let user = CentralUser::new(name.to_string(), email.to_string(), PasswordService::hash(password)?);
        let user = self.user_repo.create(&user).await?;
        info!("Super admin created: {}", crm_shared::utils::mask_email(&user.email));
        Ok(Some(user))
    }

    /// Rejects tokens of administrators that were removed or deactivated
    /// after the token was issued.
    pub async fn ensure_active(&self, id: &Uuid) -> Result<(), DomainError> {
        match self.user_repo.find_by_id(id).await? {
            Some(user) if user.is_active => Ok(()),
            Some(_) => Err(DomainError::UserNotActive),
            None => Err(DomainError::InvalidCredentials),
        }
    }

    pub async fn me(&self, id: &Uuid) -> Result<UserInfo, DomainError> {
        let user = self
            .user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))?;
        Ok(UserInfo {
            id: user.id,
            name: user.name,
            email: user.email,
            permissions: Vec::new(),
        })
    }
}

/// Users of one tenant database. Built per request against that tenant's pool.
pub struct TenantAuthService<U: UserRepository, R: RoleRepository> {
    user_repo: Arc<U>,
    role_repo: Arc<R>,
    jwt: Arc<JwtService>,
    tenant_id: Uuid,
}

impl<U: UserRepository, R: RoleRepository> TenantAuthService<U, R> {
    pub fn new(user_repo: Arc<U>, role_repo: Arc<R>, jwt: Arc<JwtService>, tenant_id: Uuid) -> Self {
        Self {
            user_repo,
            role_repo,
            jwt,
            tenant_id,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, DomainError> {
        let email = email.trim().to_lowercase();
        info!("Tenant login attempt on {} for {}", self.tenant_id, crm_shared::utils::mask_email(&email));

        let user = self.user_repo.find_by_email(&email).await?.ok_or_else(|| {
            warn!("Login failed: email not found");
            DomainError::InvalidCredentials
        })?;
        user.ensure_active()?;
        check_password(password, &user.password_hash, &email)?;

        let roles = self.role_repo.roles_for_user(&user.id).await?;
        let permissions = effective_permissions(&roles);
        let access_token = self
            .jwt
            .generate_tenant_token(&user.id, &self.tenant_id, permissions.clone())
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))?;

        if let Err(e) = self.user_repo.record_login(&user.id, Utc::now()).await {
            error!("Failed to update last login: {}", e);
        }

        Ok(LoginResult {
            user: UserInfo {
                id: user.id,
                name: user.name,
                email: user.email,
                permissions,
            },
            access_token,
            token_type: "Bearer",
            expires_in: self.jwt.expiry_seconds(),
        })
    }

    /// Permissions the user holds right now. Role changes and deactivation
    /// take effect on the next request, not when the token expires.
    pub async fn current_permissions(&self, id: &Uuid) -> Result<Vec<String>, DomainError> {
        let user = self.user_repo.find_by_id(id).await?.ok_or_else(|| {
            warn!("Token presented for a removed user on tenant {}", self.tenant_id);
            DomainError::InvalidCredentials
        })?;
        user.ensure_active()?;
        let roles = self.role_repo.roles_for_user(&user.id).await?;
        Ok(effective_permissions(&roles))
    }

    pub async fn me(&self, id: &Uuid) -> Result<UserInfo, DomainError> {
        let user = self
            .user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))?;
        let roles = self.role_repo.roles_for_user(&user.id).await?;
        Ok(UserInfo {
            id: user.id,
            name: user.name,
            email: user.email,
            permissions: effective_permissions(&roles),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, TenantUser};
    use crate::repositories::{MockCentralUserRepository, MockRoleRepository, MockUserRepository};
    use crm_security::jwt::TokenScope;

    const PASSWORD: &str = "violet-Harbor-lamp-93";

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new("test-secret-key-for-jwt".to_string(), 3600))
    }

    #[tokio::test]
    async fn test_central_login_wrong_password() {
        let user = CentralUser::new("Root".into(), "root@crm.test".into(), PasswordService::hash(PASSWORD).unwrap());
        let mut repo = MockCentralUserRepository::new();
        repo.expect_find_by_email().returning(move |_| Ok(Some(user.clone())));
        repo.expect_record_login().never();

        let svc = CentralAuthService::new(Arc::new(repo), jwt());
        let result = svc.login("root@crm.test", "not-the-password").await;
        assert!(matches!(result, Err(DomainError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_central_login_issues_central_token() {
        let user = CentralUser::new("Root".into(), "root@crm.test".into(), PasswordService::hash(PASSWORD).unwrap());
        let mut repo = MockCentralUserRepository::new();
        repo.expect_find_by_email()
            .withf(|e| e == "root@crm.test")
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_record_login().times(1).returning(|_, _| Ok(()));

        let jwt = jwt();
        let svc = CentralAuthService::new(Arc::new(repo), jwt.clone());
        let result = svc.login(" Root@CRM.test ", PASSWORD).await.unwrap();
        let claims = jwt.validate_token(&result.access_token).unwrap();
        assert_eq!(claims.scope, TokenScope::Central);
        assert!(claims.tenant_id.is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_skipped_when_admin_exists() {
        let mut repo = MockCentralUserRepository::new();
        repo.expect_count().returning(|| Ok(1));
        repo.expect_create().never();

        let svc = CentralAuthService::new(Arc::new(repo), jwt());
        assert!(svc.bootstrap_super_admin("Root", "root@crm.test", PASSWORD).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_creates_first_admin() {
        let mut repo = MockCentralUserRepository::new();
        repo.expect_count().returning(|| Ok(0));
        repo.expect_create()
            .withf(|u| u.email == "root@crm.test" && u.password_hash != PASSWORD)
            .times(1)
            .returning(|u| Ok(u.clone()));

        let svc = CentralAuthService::new(Arc::new(repo), jwt());
        assert!(svc.bootstrap_super_admin("Root", "root@crm.test", PASSWORD).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tenant_token_carries_role_permissions() {
        let user = TenantUser::new("Sam", "sam@acme.test", PasswordService::hash(PASSWORD).unwrap(), vec![]);
        let tenant_id = Uuid::new_v4();
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(move |_| Ok(Some(user.clone())));
        users.expect_record_login().returning(|_, _| Ok(()));
        let mut roles = MockRoleRepository::new();
        roles.expect_roles_for_user().returning(|_| {
            Ok(vec![
                Role::new("closers", vec!["deals.view".into(), "leads.view".into()]).unwrap(),
                Role::new("support", vec!["leads.view".into()]).unwrap(),
            ])
        });

        let jwt = jwt();
        let svc = TenantAuthService::new(Arc::new(users), Arc::new(roles), jwt.clone(), tenant_id);
        let result = svc.login("sam@acme.test", PASSWORD).await.unwrap();
        assert_eq!(result.user.permissions, vec!["deals.view".to_string(), "leads.view".to_string()]);

        let claims = jwt.validate_token(&result.access_token).unwrap();
        assert_eq!(claims.scope, TokenScope::Tenant);
        assert_eq!(claims.tenant_id, Some(tenant_id));
        assert!(claims.has_permission("deals.view"));
    }

    #[tokio::test]
    async fn test_inactive_tenant_user_rejected() {
        let mut user = TenantUser::new("Sam", "sam@acme.test", PasswordService::hash(PASSWORD).unwrap(), vec![]);
        user.is_active = false;
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(move |_| Ok(Some(user.clone())));
        let mut roles = MockRoleRepository::new();
        roles.expect_roles_for_user().never();

        let svc = TenantAuthService::new(Arc::new(users), Arc::new(roles), jwt(), Uuid::new_v4());
        assert!(matches!(svc.login("sam@acme.test", PASSWORD).await, Err(DomainError::UserNotActive)));
    }

    #[tokio::test]
    async fn test_current_permissions_follow_role_changes() {
        let user = TenantUser::new("Sam", "sam@acme.test", PasswordService::hash(PASSWORD).unwrap(), vec![]);
        let id = user.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));
        let mut roles = MockRoleRepository::new();
        roles
            .expect_roles_for_user()
            .returning(|_| Ok(vec![Role::new("viewers", vec!["leads.view".into()]).unwrap()]));

        let svc = TenantAuthService::new(Arc::new(users), Arc::new(roles), jwt(), Uuid::new_v4());
        assert_eq!(svc.current_permissions(&id).await.unwrap(), vec!["leads.view".to_string()]);
    }

    #[tokio::test]
    async fn test_current_permissions_reject_deactivated_or_removed_user() {
        let mut user = TenantUser::new("Sam", "sam@acme.test", PasswordService::hash(PASSWORD).unwrap(), vec![]);
        user.is_active = false;
        let inactive_id = user.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |id| Ok((*id == inactive_id).then(|| user.clone())));
        let mut roles = MockRoleRepository::new();
        roles.expect_roles_for_user().never();

        let svc = TenantAuthService::new(Arc::new(users), Arc::new(roles), jwt(), Uuid::new_v4());
        assert!(matches!(svc.current_permissions(&inactive_id).await, Err(DomainError::UserNotActive)));
        assert!(matches!(
            svc.current_permissions(&Uuid::new_v4()).await,
            Err(DomainError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_central_ensure_active() {
        let mut user = CentralUser::new("Root".into(), "root@crm.test".into(), PasswordService::hash(PASSWORD).unwrap());
        user.is_active = false;
        let mut repo = MockCentralUserRepository::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));

        let svc = CentralAuthService::new(Arc::new(repo), jwt());
        assert!(matches!(svc.ensure_active(&Uuid::new_v4()).await, Err(DomainError::UserNotActive)));
    }
}
