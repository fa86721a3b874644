//! Team repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Team;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Team>, DomainError>;
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Team>, DomainError>;
    /// Inserts the team with its members.
    async fn create(&self, team: &Team) -> Result<Team, DomainError>;
    /// Updates the team and replaces its members.
    async fn update(&self, team: &Team) -> Result<Team, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
}
