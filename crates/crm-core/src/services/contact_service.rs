//! Contact service

use std::sync::Arc;

use crm_shared::{PaginatedResult, Pagination};
use tracing::info;
use uuid::Uuid;

use crate::domain::{Contact, ContactChanges, ContactFilter, NewContact};
use crate::error::DomainError;
use crate::repositories::ContactRepository;

pub struct ContactService<R: ContactRepository> {
    repo: Arc<R>,
}

impl<R: ContactRepository> ContactService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: NewContact) -> Result<Contact, DomainError> {
        let contact = self.repo.create(&Contact::new(input)?).await?;
        info!("Contact created: {}", contact.id);
        Ok(contact)
    }

    pub async fn list(&self, filter: &ContactFilter, pagination: Pagination) -> Result<PaginatedResult<Contact>, DomainError> {
        self.repo.list(filter, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Contact, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("contact", id))
    }

    pub async fn update(&self, id: &Uuid, changes: ContactChanges) -> Result<Contact, DomainError> {
        let mut contact = self.get(id).await?;
        contact.apply(changes)?;
        self.repo.update(&contact).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let contact = self.get(id).await?;
        self.repo.delete(&contact.id).await?;
        info!("Contact deleted: {}", contact.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MockContactRepository;

    #[tokio::test]
    async fn test_create_normalizes_email() {
        let mut repo = MockContactRepository::new();
        repo.expect_create()
            .withf(|c| c.email.as_deref() == Some("nour@acme.test") && c.last_name.is_none())
            .times(1)
            .returning(|c| Ok(c.clone()));

        let input = NewContact {
            first_name: "Nour".into(),
            last_name: Some("  ".into()),
            email: Some(" Nour@Acme.TEST".into()),
            phone: None,
            company: None,
            position: None,
            location_id: None,
            notes: None,
        };
        ContactService::new(Arc::new(repo)).create(input).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_contact() {
        let mut repo = MockContactRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_delete().never();

        let result = ContactService::new(Arc::new(repo)).delete(&Uuid::new_v4()).await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "contact", .. })));
    }
}
