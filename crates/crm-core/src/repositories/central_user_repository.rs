//! Central user repository trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::CentralUser;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CentralUserRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CentralUser>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<CentralUser>, DomainError>;
    async fn count(&self) -> Result<i64, DomainError>;
    async fn create(&self, user: &CentralUser) -> Result<CentralUser, DomainError>;
    async fn record_login(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), DomainError>;
}
