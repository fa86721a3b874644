//! Deal service: CRUD and stage moves

use std::sync::Arc;

use crm_shared::{PaginatedResult, Pagination};
use tracing::info;
use uuid::Uuid;

use crate::domain::{Deal, DealChanges, DealFilter, NewDeal, Stage};
use crate::error::DomainError;
use crate::repositories::{DealRepository, PipelineRepository};

pub struct DealService<D: DealRepository, P: PipelineRepository> {
    deal_repo: Arc<D>,
    pipeline_repo: Arc<P>,
}

impl<D: DealRepository, P: PipelineRepository> DealService<D, P> {
    pub fn new(deal_repo: Arc<D>, pipeline_repo: Arc<P>) -> Self {
        Self { deal_repo, pipeline_repo }
    }

    pub async fn create(&self, input: NewDeal) -> Result<Deal, DomainError> {
        let stage = match &input.stage_id {
            Some(id) => self.load_stage(id).await?,
            None => self.default_stage().await?,
        };
        let deal = self.deal_repo.create(&Deal::new(input, &stage)?).await?;
        info!("Deal created: {} in stage {}", deal.id, stage.name);
        Ok(deal)
    }

    pub async fn list(&self, filter: &DealFilter, pagination: Pagination) -> Result<PaginatedResult<Deal>, DomainError> {
        self.deal_repo.list(filter, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Deal, DomainError> {
        self.deal_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("deal", id))
    }

    pub async fn update(&self, id: &Uuid, changes: DealChanges) -> Result<Deal, DomainError> {
        let mut deal = self.get(id).await?;
        deal.apply(changes)?;
        self.deal_repo.update(&deal).await
    }

    /// Status follows the target stage's won/lost flags.
    pub async fn move_stage(&self, id: &Uuid, stage_id: &Uuid) -> Result<Deal, DomainError> {
        let mut deal = self.get(id).await?;
        let stage = self.load_stage(stage_id).await?;
        deal.move_to(&stage);
        let deal = self.deal_repo.update(&deal).await?;
        info!("Deal {} moved to stage {} ({})", deal.id, stage.name, deal.status);
        Ok(deal)
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let deal = self.get(id).await?;
        self.deal_repo.delete(&deal.id).await
    }

    async fn load_stage(&self, id: &Uuid) -> Result<Stage, DomainError> {
        self.pipeline_repo
            .find_stage(id)
            .await?
            .ok_or_else(|| DomainError::not_found("stage", id))
    }

    async fn default_stage(&self) -> Result<Stage, DomainError> {
        let pipeline = self
            .pipeline_repo
            .find_default()
            .await?
            .ok_or_else(|| DomainError::ValidationError("stage_id is required: no default pipeline".to_string()))?;
        pipeline
            .entry_stage()
            .cloned()
            .ok_or_else(|| DomainError::ValidationError("default pipeline has no open stage".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DealStatus, Pipeline};
    use crate::repositories::{MockDealRepository, MockPipelineRepository};

    fn new_deal(stage_id: Option<Uuid>) -> NewDeal {
        NewDeal {
            title: "Annual plan".into(),
            contact_id: None,
            lead_id: None,
            stage_id,
            amount_cents: 250_000,
            currency: None,
            expected_close_date: None,
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_entry_stage() {
        let pipeline = Pipeline::default_sales();
        let entry = pipeline.entry_stage().map(|s| s.id);
        let mut deals = MockDealRepository::new();
        deals
            .expect_create()
            .withf(move |d| Some(d.stage_id) == entry && d.status == DealStatus::Open)
            .times(1)
            .returning(|d| Ok(d.clone()));
        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_default().returning(move || Ok(Some(pipeline.clone())));

        DealService::new(Arc::new(deals), Arc::new(pipelines))
            .create(new_deal(None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_move_to_won_stage_closes_deal() {
        let pipeline = Pipeline::default_sales();
        let entry = pipeline.entry_stage().cloned().unwrap();
        let won = pipeline.stages.iter().find(|s| s.is_won).cloned().unwrap();
        let won_id = won.id;
        let deal = Deal::new(new_deal(Some(entry.id)), &entry).unwrap();
        let deal_id = deal.id;

        let mut deals = MockDealRepository::new();
        deals.expect_find_by_id().returning(move |_| Ok(Some(deal.clone())));
        deals.expect_update().returning(|d| Ok(d.clone()));
        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_stage().returning(move |_| Ok(Some(won.clone())));

        let moved = DealService::new(Arc::new(deals), Arc::new(pipelines))
            .move_stage(&deal_id, &won_id)
            .await
            .unwrap();
        assert_eq!(moved.status, DealStatus::Won);
        assert!(moved.closed_at.is_some());
    }

    #[tokio::test]
    async fn test_create_with_unknown_stage() {
        let mut deals = MockDealRepository::new();
        deals.expect_create().never();
        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_stage().returning(|_| Ok(None));

        let result = DealService::new(Arc::new(deals), Arc::new(pipelines))
            .create(new_deal(Some(Uuid::new_v4())))
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "stage", .. })));
    }
}
