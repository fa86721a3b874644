//! Industries, services and custom field definitions

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::{CatalogItem, CatalogKind, CustomField, CustomFieldType};
use crate::error::DomainError;
use crate::repositories::CatalogRepository;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItemInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomField {
    pub name: String,
    pub field_type: CustomFieldType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub is_required: bool,
}

/// The field type is fixed once values may have been stored against it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomFieldChanges {
    pub name: Option<String>,
    pub options: Option<Vec<String>>,
    pub is_required: Option<bool>,
}

pub struct CatalogService<R: CatalogRepository> {
    repo: Arc<R>,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>, DomainError> {
        self.repo.list_items(kind).await
    }

    pub async fn create_item(&self, kind: CatalogKind, input: CatalogItemInput) -> Result<CatalogItem, DomainError> {
        let item = CatalogItem::new(kind, &input.name, input.description)?;
        self.ensure_item_name_free(kind, &item.name, None).await?;
        let item = self.repo.create_item(&item).await?;
        info!("Catalog {} created: {}", kind, item.name);
        Ok(item)
    }

    pub async fn update_item(&self, kind: CatalogKind, id: &Uuid, input: CatalogItemInput) -> Result<CatalogItem, DomainError> {
        let current = self
            .repo
            .find_item(kind, id)
            .await?
            .ok_or_else(|| DomainError::not_found(kind.label(), id))?;
        let renamed = CatalogItem::new(kind, &input.name, input.description)?;
        self.ensure_item_name_free(kind, &renamed.name, Some(current.id)).await?;
        let item = CatalogItem {
            id: current.id,
            created_at: current.created_at,
            ..renamed
        };
        self.repo.update_item(&item).await
    }

    pub async fn delete_item(&self, kind: CatalogKind, id: &Uuid) -> Result<(), DomainError> {
        if self.repo.find_item(kind, id).await?.is_none() {
            return Err(DomainError::not_found(kind.label(), id));
        }
        self.repo.delete_item(kind, id).await
    }

    pub async fn list_fields(&self) -> Result<Vec<CustomField>, DomainError> {
        self.repo.list_fields().await
    }

    pub async fn create_field(&self, input: NewCustomField) -> Result<CustomField, DomainError> {
        let field = CustomField::new(&input.name, input.field_type, input.options, input.is_required)?;
        self.ensure_field_name_free(&field.name, None).await?;
        let field = self.repo.create_field(&field).await?;
        info!("Custom field created: {} ({})", field.name, field.field_type);
        Ok(field)
    }

    pub async fn update_field(&self, id: &Uuid, changes: CustomFieldChanges) -> Result<CustomField, DomainError> {
        let mut field = self
            .repo
            .find_field(id)
            .await?
            .ok_or_else(|| DomainError::not_found("custom field", id))?;
        field.update(changes.name.as_deref(), changes.options, changes.is_required)?;
        self.ensure_field_name_free(&field.name, Some(field.id)).await?;
        self.repo.update_field(&field).await
    }

    pub async fn delete_field(&self, id: &Uuid) -> Result<(), DomainError> {
        if self.repo.find_field(id).await?.is_none() {
            return Err(DomainError::not_found("custom field", id));
        }
        self.repo.delete_field(id).await
    }

    async fn ensure_item_name_free(&self, kind: CatalogKind, name: &str, current: Option<Uuid>) -> Result<(), DomainError> {
        match self.repo.find_item_by_name(kind, name).await? {
            Some(existing) if Some(existing.id) != current => Err(DomainError::NameAlreadyExists {
                entity: kind.label(),
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn ensure_field_name_free(&self, name: &str, current: Option<Uuid>) -> Result<(), DomainError> {
        match self.repo.find_field_by_name(name).await? {
            Some(existing) if Some(existing.id) != current => Err(DomainError::NameAlreadyExists {
                entity: "custom field",
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MockCatalogRepository;

    #[tokio::test]
    async fn test_duplicate_industry_rejected() {
        let existing = CatalogItem::new(CatalogKind::Industry, "Retail", None).unwrap();
        let mut repo = MockCatalogRepository::new();
        repo.expect_find_item_by_name()
            .withf(|kind, name| *kind == CatalogKind::Industry && name == "Retail")
            .returning(move |_, _| Ok(Some(existing.clone())));
        repo.expect_create_item().never();

        let input = CatalogItemInput {
            name: " Retail ".into(),
            description: None,
        };
        let result = CatalogService::new(Arc::new(repo))
            .create_item(CatalogKind::Industry, input)
            .await;
        assert!(matches!(result, Err(DomainError::NameAlreadyExists { entity: "industry", .. })));
    }

    #[tokio::test]
    async fn test_rename_keeps_identity() {
        let current = CatalogItem::new(CatalogKind::Service, "Consulting", None).unwrap();
        let id = current.id;
        let mut repo = MockCatalogRepository::new();
        let found = current.clone();
        repo.expect_find_item().returning(move |_, _| Ok(Some(found.clone())));
        repo.expect_find_item_by_name().returning(|_, _| Ok(None));
        repo.expect_update_item()
            .withf(move |i| i.id == id && i.name == "Advisory")
            .times(1)
            .returning(|i| Ok(i.clone()));

        let input = CatalogItemInput {
            name: "Advisory".into(),
            description: Some("Strategy work".into()),
        };
        CatalogService::new(Arc::new(repo))
            .update_item(CatalogKind::Service, &id, input)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_select_field_needs_options() {
        let mut repo = MockCatalogRepository::new();
        repo.expect_create_field().never();

        let input = NewCustomField {
            name: "Size".into(),
            field_type: CustomFieldType::Select,
            options: vec![],
            is_required: false,
        };
        let result = CatalogService::new(Arc::new(repo)).create_field(input).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }
}
