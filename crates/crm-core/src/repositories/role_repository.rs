//! Role repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Role;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Role>, DomainError>;
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Role>, DomainError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, DomainError>;
    async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<Role>, DomainError>;
    async fn roles_for_user(&self, user_id: &Uuid) -> Result<Vec<Role>, DomainError>;
    async fn create(&self, role: &Role) -> Result<Role, DomainError>;
    async fn update(&self, role: &Role) -> Result<Role, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
}
