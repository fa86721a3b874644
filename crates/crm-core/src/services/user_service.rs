// ============================================================================
// CRM Core - Tenant User Service
// File: crates/crm-core/src/services/user_service.rs
// ============================================================================
//! Tenant user management with role assignment and the tier's seat limit.

use std::sync::Arc;

use crm_security::password::{PasswordPolicy, PasswordService};
use crm_shared::{PaginatedResult, Pagination};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{NewTenantUser, TenantUser, TierLimits, UserChanges};
use crate::error::DomainError;
use crate::repositories::{RoleRepository, UserRepository};

pub struct UserService<U: UserRepository, R: RoleRepository> {
    user_repo: Arc<U>,
    role_repo: Arc<R>,
    limits: TierLimits,
}

impl<U: UserRepository, R: RoleRepository> UserService<U, R> {
    pub fn new(user_repo: Arc<U>, role_repo: Arc<R>, limits: TierLimits) -> Self {
        Self {
            user_repo,
            role_repo,
            limits,
        }
    }

    pub async fn create(&self, input: NewTenantUser) -> Result<TenantUser, DomainError> {
        input.validate()?;
        let current = self.user_repo.count().await?;
        self.limits.ensure_capacity("users", current)?;

        PasswordPolicy::check(&input.password, &[input.email.as_str(), input.name.as_str()])?;
        self.ensure_email_free(&input.email, None).await?;
        self.ensure_roles_exist(&input.role_ids).await?;

        let password_hash = PasswordService::hash(&input.password)?;
        let user = TenantUser::new(&input.name, &input.email, password_hash, input.role_ids);
        let user = self.user_repo.create(&user).await?;
        info!("Tenant user created: {}", crm_shared::utils::mask_email(&user.email));
        Ok(user)
    }

    pub async fn list(&self, search: Option<String>, pagination: Pagination) -> Result<PaginatedResult<TenantUser>, DomainError> {
        self.user_repo.list(search, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<TenantUser, DomainError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))
    }

    pub async fn update(&self, id: &Uuid, changes: UserChanges) -> Result<TenantUser, DomainError> {
        let mut user = self.get(id).await?;
        if let Some(email) = &changes.email {
            self.ensure_email_free(email, Some(user.id)).await?;
        }
        let password_hash = match &changes.password {
            Some(password) => {
                let email = changes.email.as_deref().unwrap_or(&user.email);
                let name = changes.name.as_deref().unwrap_or(&user.name);
                PasswordPolicy::check(password, &[email, name])?;
                Some(PasswordService::hash(password)?)
            }
            None => None,
        };
        user.apply(&changes, password_hash)?;
        self.user_repo.update(&user).await
    }

    pub async fn assign_roles(&self, id: &Uuid, role_ids: Vec<Uuid>) -> Result<TenantUser, DomainError> {
        let user = self.get(id).await?;
        self.ensure_roles_exist(&role_ids).await?;
        self.user_repo.set_roles(&user.id, role_ids).await?;
        self.get(id).await
    }

    /// Users cannot delete their own account.
    pub async fn delete(&self, id: &Uuid, acting_user: &Uuid) -> Result<(), DomainError> {
        if id == acting_user {
            warn!("User {} tried to delete own account", id);
            return Err(DomainError::ValidationError("you cannot delete your own account".to_string()));
        }
        let user = self.get(id).await?;
        self.user_repo.delete(&user.id).await?;
        info!("Tenant user deleted: {}", user.id);
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, current: Option<Uuid>) -> Result<(), DomainError> {
        let email = email.trim().to_lowercase();
        match self.user_repo.find_by_email(&email).await? {
            Some(existing) if Some(existing.id) != current => Err(DomainError::EmailAlreadyExists(email)),
            _ => Ok(()),
        }
    }

    async fn ensure_roles_exist(&self, role_ids: &[Uuid]) -> Result<(), DomainError> {
        if role_ids.is_empty() {
            return Ok(());
        }
        let found = self.role_repo.find_many(role_ids.to_vec()).await?;
        match role_ids.iter().find(|id| !found.iter().any(|r| &r.id == *id)) {
            Some(missing) => Err(DomainError::not_found("role", missing)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::repositories::{MockRoleRepository, MockUserRepository};

    const PASSWORD: &str = "violet-Harbor-lamp-93";

    fn limits(max_users: i32) -> TierLimits {
        TierLimits {
            max_users,
            max_leads: None,
            modules: vec![],
        }
    }

    fn new_user(role_ids: Vec<Uuid>) -> NewTenantUser {
        NewTenantUser {
            name: "Mona Adel".into(),
            email: "mona@acme.test".into(),
            password: PASSWORD.into(),
            role_ids,
        }
    }

    #[tokio::test]
    async fn test_seat_limit_enforced() {
        let mut users = MockUserRepository::new();
        users.expect_count().returning(|| Ok(3));
        users.expect_create().never();

        let result = UserService::new(Arc::new(users), Arc::new(MockRoleRepository::new()), limits(3))
            .create(new_user(vec![]))
            .await;
        assert!(matches!(result, Err(DomainError::TierLimitReached(_))));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_count().returning(|| Ok(0));
        users.expect_create().never();

        let mut input = new_user(vec![]);
        input.password = "password".into();
        let result = UserService::new(Arc::new(users), Arc::new(MockRoleRepository::new()), limits(5))
            .create(input)
            .await;
        assert!(matches!(result, Err(DomainError::PasswordTooWeak)));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let existing = TenantUser::new("Mona", "mona@acme.test", "hash".into(), vec![]);
        let mut users = MockUserRepository::new();
        users.expect_count().returning(|| Ok(1));
        users.expect_find_by_email().returning(move |_| Ok(Some(existing.clone())));
        users.expect_create().never();

        let result = UserService::new(Arc::new(users), Arc::new(MockRoleRepository::new()), limits(5))
            .create(new_user(vec![]))
            .await;
        assert!(matches!(result, Err(DomainError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_create_with_roles() {
        let sales = Role::new("sales", vec!["leads.view".into()]).unwrap();
        let sales_id = sales.id;
        let mut users = MockUserRepository::new();
        users.expect_count().returning(|| Ok(1));
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_create()
            .withf(move |u| u.role_ids == vec![sales_id] && u.password_hash.starts_with("$argon2"))
            .times(1)
            .returning(|u| Ok(u.clone()));
        let mut roles = MockRoleRepository::new();
        roles.expect_find_many().returning(move |_| Ok(vec![sales.clone()]));

        UserService::new(Arc::new(users), Arc::new(roles), limits(5))
            .create(new_user(vec![sales_id]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_role_rejected() {
        let mut users = MockUserRepository::new();
        let user = TenantUser::new("Mona", "mona@acme.test", "hash".into(), vec![]);
        let id = user.id;
        users.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));
        users.expect_set_roles().never();
        let mut roles = MockRoleRepository::new();
        roles.expect_find_many().returning(|_| Ok(vec![]));

        let result = UserService::new(Arc::new(users), Arc::new(roles), limits(5))
            .assign_roles(&id, vec![Uuid::new_v4()])
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "role", .. })));
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let mut users = MockUserRepository::new();
        users.expect_delete().never();
        let id = Uuid::new_v4();

        let result = UserService::new(Arc::new(users), Arc::new(MockRoleRepository::new()), limits(5))
            .delete(&id, &id)
            .await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }
}
