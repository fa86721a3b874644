//! Catalog repository trait (port): industries, services, custom fields

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CatalogItem, CatalogKind, CustomField};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>, DomainError>;
    async fn find_item(&self, kind: CatalogKind, id: &Uuid) -> Result<Option<CatalogItem>, DomainError>;
    async fn find_item_by_name(&self, kind: CatalogKind, name: &str) -> Result<Option<CatalogItem>, DomainError>;
    /// Subset of `ids` that exist for `kind`.
    async fn existing_item_ids(&self, kind: CatalogKind, ids: Vec<Uuid>) -> Result<Vec<Uuid>, DomainError>;
    async fn create_item(&self, item: &CatalogItem) -> Result<CatalogItem, DomainError>;
    async fn update_item(&self, item: &CatalogItem) -> Result<CatalogItem, DomainError>;
    async fn delete_item(&self, kind: CatalogKind, id: &Uuid) -> Result<(), DomainError>;

    async fn list_fields(&self) -> Result<Vec<CustomField>, DomainError>;
    async fn find_field(&self, id: &Uuid) -> Result<Option<CustomField>, DomainError>;
    async fn find_field_by_name(&self, name: &str) -> Result<Option<CustomField>, DomainError>;
    async fn create_field(&self, field: &CustomField) -> Result<CustomField, DomainError>;
    async fn update_field(&self, field: &CustomField) -> Result<CustomField, DomainError>;
    async fn delete_field(&self, id: &Uuid) -> Result<(), DomainError>;
}
