// ============================================================================
// CRM Core - Code Services
// File: crates/crm-core/src/services/code_service.rs
// Description: Activation code batches and discount codes
// ============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crm_shared::constants::MAX_ACTIVATION_CODES_PER_BATCH;
use crm_shared::{PaginatedResult, Pagination};
use tracing::info;
use uuid::Uuid;

use crate::domain::{ActivationCode, ActivationCodeFilter, DiscountCode, NewDiscountCode, PriceQuote, Tier};
use crate::error::DomainError;
use crate::repositories::{ActivationCodeRepository, DiscountCodeRepository, TierRepository};

async fn load_tier<T: TierRepository>(tier_repo: &T, id: &Uuid) -> Result<Tier, DomainError> {
    tier_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("tier", id))
}

/// Generates, lists and revokes activation codes. Redemption is part of
/// provisioning because it may create a tenant.
pub struct ActivationCodeService<A: ActivationCodeRepository, T: TierRepository> {
    code_repo: Arc<A>,
    tier_repo: Arc<T>,
}

impl<A: ActivationCodeRepository, T: TierRepository> ActivationCodeService<A, T> {
    pub fn new(code_repo: Arc<A>, tier_repo: Arc<T>) -> Self {
        Self { code_repo, tier_repo }
    }

    pub async fn generate(
        &self,
        tier_id: &Uuid,
        count: u32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivationCode>, DomainError> {
        if count == 0 || count > MAX_ACTIVATION_CODES_PER_BATCH {
            return Err(DomainError::ValidationError(format!(
                "count must be between 1 and {}",
                MAX_ACTIVATION_CODES_PER_BATCH
            )));
        }
        if expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(DomainError::ValidationError("expiry must be in the future".to_string()));
        }
        let tier = load_tier(self.tier_repo.as_ref(), tier_id).await?;

        let codes: Vec<ActivationCode> = (0..count)
            .map(|_| ActivationCode::generate(tier.id, expires_at))
            .collect();
        let created = self.code_repo.create_batch(codes).await?;
        info!("Generated {} activation codes for tier {}", created.len(), tier.id);
        Ok(created)
    }

    pub async fn list(
        &self,
        filter: &ActivationCodeFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResult<ActivationCode>, DomainError> {
        self.code_repo.list(filter, pagination.normalized()).await
    }

    pub async fn revoke(&self, id: &Uuid) -> Result<ActivationCode, DomainError> {
        let mut code = self
            .code_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("activation code", id))?;
        code.revoke()?;

        // Guarded on `unused` so a concurrent redemption wins cleanly.
        if !self.code_repo.revoke(id).await? {
            return Err(DomainError::ActivationCodeAlreadyUsed);
        }
        info!("Activation code revoked: {}", id);
        Ok(code)
    }
}

pub struct DiscountCodeService<D: DiscountCodeRepository, T: TierRepository> {
    code_repo: Arc<D>,
    tier_repo: Arc<T>,
}

impl<D: DiscountCodeRepository, T: TierRepository> DiscountCodeService<D, T> {
    pub fn new(code_repo: Arc<D>, tier_repo: Arc<T>) -> Self {
        Self { code_repo, tier_repo }
    }

    pub async fn create(&self, input: NewDiscountCode) -> Result<DiscountCode, DomainError> {
        let code = DiscountCode::new(input)?;
        if let Some(tier_id) = code.tier_id {
            load_tier(self.tier_repo.as_ref(), &tier_id).await?;
        }
        if self.code_repo.find_by_code(&code.code).await?.is_some() {
            return Err(DomainError::CodeAlreadyExists(code.code));
        }
        let created = self.code_repo.create(&code).await?;
        info!("Discount code created: {}", created.code);
        Ok(created)
    }

    pub async fn list(&self, pagination: Pagination) -> Result<PaginatedResult<DiscountCode>, DomainError> {
        self.code_repo.list(pagination.normalized()).await
    }

    pub async fn deactivate(&self, id: &Uuid) -> Result<DiscountCode, DomainError> {
        let mut code = self
            .code_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("discount code", id))?;
        code.is_active = false;
        self.code_repo.update(&code).await
    }

    /// Price of `tier_id` with `code` applied.
    pub async fn quote(&self, code: &str, tier_id: &Uuid) -> Result<PriceQuote, DomainError> {
        let tier = load_tier(self.tier_repo.as_ref(), tier_id).await?;
        tier.ensure_purchasable()?;
        let normalized = crm_security::codes::normalize_code(code);
        let discount = self
            .code_repo
            .find_by_code(&normalized)
            .await?
            .ok_or_else(|| DomainError::not_found("discount code", &normalized))?;
        discount.quote(&tier, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::sample_tier;
    use crate::domain::{ActivationCodeStatus, DiscountKind};
    use crate::repositories::{MockActivationCodeRepository, MockDiscountCodeRepository, MockTierRepository};

    fn tiers_with(tier: Tier) -> MockTierRepository {
        let mut tiers = MockTierRepository::new();
        tiers.expect_find_by_id().returning(move |_| Ok(Some(tier.clone())));
        tiers
    }

    #[tokio::test]
    async fn test_generate_batch() {
        let tier = sample_tier(0);
        let tier_id = tier.id;
        let mut codes = MockActivationCodeRepository::new();
        codes
            .expect_create_batch()
            .withf(|batch| batch.len() == 3)
            .returning(|batch| Ok(batch));

        let service = ActivationCodeService::new(Arc::new(codes), Arc::new(tiers_with(tier)));
        let created = service.generate(&tier_id, 3, None).await.unwrap();
        assert_eq!(created.len(), 3);
        assert!(created.iter().all(|c| c.status == ActivationCodeStatus::Unused && c.tier_id == tier_id));
    }

    #[tokio::test]
    async fn test_generate_rejects_bad_count() {
        let service = ActivationCodeService::new(
            Arc::new(MockActivationCodeRepository::new()),
            Arc::new(MockTierRepository::new()),
        );
        assert!(service.generate(&Uuid::new_v4(), 0, None).await.is_err());
        assert!(service.generate(&Uuid::new_v4(), 501, None).await.is_err());
    }

    #[tokio::test]
    async fn test_revoke_loses_race_to_redemption() {
        let code = ActivationCode::generate(Uuid::new_v4(), None);
        let id = code.id;
        let mut codes = MockActivationCodeRepository::new();
        codes.expect_find_by_id().returning(move |_| Ok(Some(code.clone())));
        codes.expect_revoke().returning(|_| Ok(false));

        let service = ActivationCodeService::new(Arc::new(codes), Arc::new(MockTierRepository::new()));
        assert!(matches!(service.revoke(&id).await, Err(DomainError::ActivationCodeAlreadyUsed)));
    }

    #[tokio::test]
    async fn test_quote_with_code() {
        let tier = sample_tier(10_000);
        let tier_id = tier.id;
        let discount = DiscountCode::new(NewDiscountCode {
            code: "SPRING".into(),
            kind: DiscountKind::Percent,
            value: 25,
            tier_id: None,
            max_uses: None,
            expires_at: None,
        })
        .unwrap();
        let mut codes = MockDiscountCodeRepository::new();
        codes
            .expect_find_by_code()
            .withf(|c| c == "SPRING")
            .returning(move |_| Ok(Some(discount.clone())));

        let service = DiscountCodeService::new(Arc::new(codes), Arc::new(tiers_with(tier)));
        let quote = service.quote(" spring ", &tier_id).await.unwrap();
        assert_eq!(quote.discount_cents, 2_500);
        assert_eq!(quote.total_cents, 7_500);
    }

    #[tokio::test]
    async fn test_duplicate_discount_code() {
        let existing = DiscountCode::new(NewDiscountCode {
            code: "SPRING".into(),
            kind: DiscountKind::Fixed,
            value: 100,
            tier_id: None,
            max_uses: None,
            expires_at: None,
        })
        .unwrap();
        let mut codes = MockDiscountCodeRepository::new();
        codes.expect_find_by_code().returning(move |_| Ok(Some(existing.clone())));
        codes.expect_create().never();

        let service = DiscountCodeService::new(Arc::new(codes), Arc::new(MockTierRepository::new()));
        let input = NewDiscountCode {
            code: "spring".into(),
            kind: DiscountKind::Fixed,
            value: 100,
            tier_id: None,
            max_uses: None,
            expires_at: None,
        };
        assert!(matches!(service.create(input).await, Err(DomainError::CodeAlreadyExists(_))));
    }
}
