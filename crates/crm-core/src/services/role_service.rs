//! Role service

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::Role;
use crate::error::DomainError;
use crate::repositories::RoleRepository;

#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub permissions: Option<Vec<String>>,
}

pub struct RoleService<R: RoleRepository> {
    repo: Arc<R>,
}

impl<R: RoleRepository> RoleService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Role>, DomainError> {
        self.repo.list().await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Role, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("role", id))
    }

    pub async fn create(&self, input: NewRole) -> Result<Role, DomainError> {
        let role = Role::new(&input.name, input.permissions)?;
        self.ensure_name_free(&role.name, None).await?;
        let role = self.repo.create(&role).await?;
        info!("Role created: {}", role.name);
        Ok(role)
    }

    pub async fn update(&self, id: &Uuid, changes: RoleChanges) -> Result<Role, DomainError> {
        let mut role = self.get(id).await?;
        role.update(changes.name.as_deref(), changes.permissions)?;
        self.ensure_name_free(&role.name, Some(role.id)).await?;
        self.repo.update(&role).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let role = self.get(id).await?;
        if role.is_admin() {
            return Err(DomainError::ValidationError("the admin role cannot be deleted".to_string()));
        }
        self.repo.delete(&role.id).await?;
        info!("Role deleted: {}", role.name);
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, current: Option<Uuid>) -> Result<(), DomainError> {
        match self.repo.find_by_name(name).await? {
            Some(existing) if Some(existing.id) != current => Err(DomainError::NameAlreadyExists {
                entity: "role",
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MockRoleRepository;

    #[tokio::test]
    async fn test_admin_role_not_deletable() {
        let admin = Role::defaults().into_iter().find(|r| r.is_admin()).unwrap();
        let id = admin.id;
        let mut repo = MockRoleRepository::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(admin.clone())));
        repo.expect_delete().never();

        let result = RoleService::new(Arc::new(repo)).delete(&id).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_permission() {
        let mut repo = MockRoleRepository::new();
        repo.expect_create().never();

        let input = NewRole {
            name: "support".into(),
            permissions: vec!["billing.manage".into()],
        };
        assert!(RoleService::new(Arc::new(repo)).create(input).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_role_name() {
        let existing = Role::new("support", vec![]).unwrap();
        let mut repo = MockRoleRepository::new();
        repo.expect_find_by_name()
            .withf(|n| n == "support")
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_create().never();

        let input = NewRole {
            name: "Support".into(),
            permissions: vec!["tasks.view".into()],
        };
        let result = RoleService::new(Arc::new(repo)).create(input).await;
        assert!(matches!(result, Err(DomainError::NameAlreadyExists { entity: "role", .. })));
    }
}
