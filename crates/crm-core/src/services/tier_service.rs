//! Tier catalogue management

use std::sync::Arc;

use crm_shared::{PaginatedResult, Pagination};
use tracing::info;
use uuid::Uuid;

use crate::domain::{NewTier, Tier, TierChanges};
use crate::error::DomainError;
use crate::repositories::TierRepository;

pub struct TierService<R: TierRepository> {
    tier_repo: Arc<R>,
}

impl<R: TierRepository> TierService<R> {
    pub fn new(tier_repo: Arc<R>) -> Self {
        Self { tier_repo }
    }

    pub async fn create(&self, input: NewTier) -> Result<Tier, DomainError> {
        let tier = Tier::new(input)?;
        self.ensure_name_free(&tier.name, None).await?;
        let created = self.tier_repo.create(&tier).await?;
        info!("Tier created: {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn list(&self, active_only: bool, pagination: Pagination) -> Result<PaginatedResult<Tier>, DomainError> {
        self.tier_repo.list(active_only, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Tier, DomainError> {
        self.tier_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("tier", id))
    }

    pub async fn update(&self, id: &Uuid, changes: TierChanges) -> Result<Tier, DomainError> {
        let mut tier = self.get(id).await?;
        tier.apply(changes)?;
        self.ensure_name_free(&tier.name, Some(tier.id)).await?;
        self.tier_repo.update(&tier).await
    }

    /// Existing subscriptions keep running; the tier just cannot be bought anymore.
    pub async fn deactivate(&self, id: &Uuid) -> Result<Tier, DomainError> {
        let mut tier = self.get(id).await?;
        tier.apply(TierChanges { is_active: Some(false), ..Default::default() })?;
        let updated = self.tier_repo.update(&tier).await?;
        info!("Tier deactivated: {}", updated.id);
        Ok(updated)
    }

    async fn ensure_name_free(&self, name: &str, current: Option<Uuid>) -> Result<(), DomainError> {
        match self.tier_repo.find_by_name(name).await? {
            Some(other) if Some(other.id) != current => Err(DomainError::NameAlreadyExists {
                entity: "tier",
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::sample_tier;
    use crate::repositories::MockTierRepository;

    #[tokio::test]
    async fn test_rename_to_taken_name_conflicts() {
        let tier = sample_tier(100);
        let other = Tier { id: Uuid::new_v4(), name: "Scale".into(), ..tier.clone() };
        let id = tier.id;

        let mut repo = MockTierRepository::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(tier.clone())));
        repo.expect_find_by_name().returning(move |_| Ok(Some(other.clone())));
        repo.expect_update().never();

        let service = TierService::new(Arc::new(repo));
        let result = service
            .update(&id, TierChanges { name: Some("Scale".into()), ..Default::default() })
            .await;
        assert!(matches!(result, Err(DomainError::NameAlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_deactivate() {
        let tier = sample_tier(100);
        let id = tier.id;
        let mut repo = MockTierRepository::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(tier.clone())));
        repo.expect_update().returning(|t| Ok(t.clone()));

        let service = TierService::new(Arc::new(repo));
        assert!(!service.deactivate(&id).await.unwrap().is_active);
    }
}
