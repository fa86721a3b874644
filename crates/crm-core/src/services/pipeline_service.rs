// ============================================================================
// CRM Core - Pipeline Service
// File: crates/crm-core/src/services/pipeline_service.rs
// ============================================================================
//! Pipelines and their ordered stages.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::pipeline::validate_pipeline_name;
use crate::domain::{NewStage, Pipeline, Stage, StageChanges};
use crate::error::DomainError;
use crate::repositories::{DealRepository, PipelineRepository};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPipeline {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub stages: Vec<NewStage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineChanges {
    pub name: Option<String>,
    pub is_default: Option<bool>,
}

pub struct PipelineService<P: PipelineRepository, D: DealRepository> {
    pipeline_repo: Arc<P>,
    deal_repo: Arc<D>,
}

impl<P: PipelineRepository, D: DealRepository> PipelineService<P, D> {
    pub fn new(pipeline_repo: Arc<P>, deal_repo: Arc<D>) -> Self {
        Self { pipeline_repo, deal_repo }
    }

    pub async fn list(&self) -> Result<Vec<Pipeline>, DomainError> {
        self.pipeline_repo.list().await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Pipeline, DomainError> {
        self.pipeline_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("pipeline", id))
    }

    pub async fn create(&self, input: NewPipeline) -> Result<Pipeline, DomainError> {
        let mut pipeline = Pipeline::new(&input.name, input.is_default)?;
        self.ensure_name_free(&pipeline.name, None).await?;
        for (position, stage) in input.stages.into_iter().enumerate() {
            pipeline.stages.push(Stage::new(pipeline.id, stage, position as i32)?);
        }
        let pipeline = self.pipeline_repo.create(&pipeline).await?;
        info!("Pipeline created: {} ({} stages)", pipeline.name, pipeline.stages.len());
        Ok(pipeline)
    }

    /// Making a pipeline the default clears the flag on the others. The
    /// default flag can only move, never be cleared.
    pub async fn update(&self, id: &Uuid, changes: PipelineChanges) -> Result<Pipeline, DomainError> {
        let mut pipeline = self.get(id).await?;
        if let Some(name) = changes.name {
            let name = validate_pipeline_name(&name)?;
            self.ensure_name_free(&name, Some(pipeline.id)).await?;
            pipeline.name = name;
        }
        match changes.is_default {
            Some(false) if pipeline.is_default => {
                return Err(DomainError::ValidationError(
                    "mark another pipeline as default instead".to_string(),
                ));
            }
            Some(flag) => pipeline.is_default = flag,
            None => {}
        }
        pipeline.updated_at = chrono::Utc::now();
        self.pipeline_repo.update(&pipeline).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let pipeline = self.get(id).await?;
        if pipeline.is_default {
            return Err(DomainError::ValidationError("the default pipeline cannot be deleted".to_string()));
        }
        if self.deal_repo.count_in_pipeline(&pipeline.id).await? > 0 {
            return Err(DomainError::InUse { entity: "pipeline" });
        }
        self.pipeline_repo.delete(&pipeline.id).await?;
        info!("Pipeline deleted: {}", pipeline.name);
        Ok(())
    }

    pub async fn add_stage(&self, pipeline_id: &Uuid, input: NewStage) -> Result<Stage, DomainError> {
        let pipeline = self.get(pipeline_id).await?;
        let stage = Stage::new(pipeline.id, input, pipeline.stages.len() as i32)?;
        self.pipeline_repo.add_stage(&stage).await
    }

    pub async fn update_stage(&self, stage_id: &Uuid, changes: StageChanges) -> Result<Stage, DomainError> {
        let mut stage = self.load_stage(stage_id).await?;
        stage.apply(changes)?;
        self.pipeline_repo.update_stage(&stage).await
    }

    /// `ordered_ids` must list every stage of the pipeline; positions become 0..n.
    pub async fn reorder_stages(&self, pipeline_id: &Uuid, ordered_ids: Vec<Uuid>) -> Result<Pipeline, DomainError> {
        let pipeline = self.get(pipeline_id).await?;
        let positions = pipeline.reorder(&ordered_ids)?;
        self.pipeline_repo.reorder_stages(&pipeline.id, positions).await?;
        self.get(pipeline_id).await
    }

    pub async fn delete_stage(&self, stage_id: &Uuid) -> Result<(), DomainError> {
        let stage = self.load_stage(stage_id).await?;
        if self.deal_repo.count_in_stage(&stage.id).await? > 0 {
            return Err(DomainError::InUse { entity: "stage" });
        }
        self.pipeline_repo.delete_stage(&stage.id).await?;

        // Close the gap left in the positions
        let pipeline = self.get(&stage.pipeline_id).await?;
        let mut remaining = pipeline.stages.clone();
        remaining.sort_by_key(|s| s.position);
        let ids: Vec<Uuid> = remaining.iter().map(|s| s.id).collect();
        let positions = pipeline.reorder(&ids)?;
        self.pipeline_repo.reorder_stages(&pipeline.id, positions).await?;
        info!("Stage deleted: {}", stage.name);
        Ok(())
    }

    async fn load_stage(&self, id: &Uuid) -> Result<Stage, DomainError> {
        self.pipeline_repo
            .find_stage(id)
            .await?
            .ok_or_else(|| DomainError::not_found("stage", id))
    }

    async fn ensure_name_free(&self, name: &str, current: Option<Uuid>) -> Result<(), DomainError> {
        match self.pipeline_repo.find_by_name(name).await? {
            Some(existing) if Some(existing.id) != current => Err(DomainError::NameAlreadyExists {
                entity: "pipeline",
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MockDealRepository, MockPipelineRepository};

    #[tokio::test]
    async fn test_stage_in_use_cannot_be_deleted() {
        let pipeline = Pipeline::default_sales();
        let stage = pipeline.stages[0].clone();
        let stage_id = stage.id;

        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_stage().returning(move |_| Ok(Some(stage.clone())));
        pipelines.expect_delete_stage().never();
        let mut deals = MockDealRepository::new();
        deals.expect_count_in_stage().returning(|_| Ok(3));

        let result = PipelineService::new(Arc::new(pipelines), Arc::new(deals))
            .delete_stage(&stage_id)
            .await;
        assert!(matches!(result, Err(DomainError::InUse { entity: "stage" })));
    }

    #[tokio::test]
    async fn test_delete_stage_compacts_positions() {
        let pipeline = Pipeline::default_sales();
        let stage = pipeline.stages[1].clone();
        let stage_id = stage.id;
        let mut after = pipeline.clone();
        after.stages.retain(|s| s.id != stage_id);

        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_stage().returning(move |_| Ok(Some(stage.clone())));
        pipelines.expect_delete_stage().times(1).returning(|_| Ok(()));
        pipelines.expect_find_by_id().returning(move |_| Ok(Some(after.clone())));
        pipelines
            .expect_reorder_stages()
            .withf(|_, positions| {
                positions.len() == 5 && positions.iter().enumerate().all(|(i, (_, p))| *p == i as i32)
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let mut deals = MockDealRepository::new();
        deals.expect_count_in_stage().returning(|_| Ok(0));

        PipelineService::new(Arc::new(pipelines), Arc::new(deals))
            .delete_stage(&stage_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_default_pipeline_cannot_be_deleted() {
        let pipeline = Pipeline::default_sales();
        let id = pipeline.id;
        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_by_id().returning(move |_| Ok(Some(pipeline.clone())));
        pipelines.expect_delete().never();

        let result = PipelineService::new(Arc::new(pipelines), Arc::new(MockDealRepository::new()))
            .delete(&id)
            .await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_pipeline_with_deals_cannot_be_deleted() {
        let pipeline = Pipeline::new("Partners", false).unwrap();
        let id = pipeline.id;
        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_by_id().returning(move |_| Ok(Some(pipeline.clone())));
        pipelines.expect_delete().never();
        let mut deals = MockDealRepository::new();
        deals.expect_count_in_pipeline().returning(|_| Ok(1));

        let result = PipelineService::new(Arc::new(pipelines), Arc::new(deals)).delete(&id).await;
        assert!(matches!(result, Err(DomainError::InUse { entity: "pipeline" })));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let existing = Pipeline::new("Partners", false).unwrap();
        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_by_name().returning(move |_| Ok(Some(existing.clone())));
        pipelines.expect_create().never();

        let input = NewPipeline {
            name: "Partners".into(),
            is_default: false,
            stages: vec![],
        };
        let result = PipelineService::new(Arc::new(pipelines), Arc::new(MockDealRepository::new()))
            .create(input)
            .await;
        assert!(matches!(result, Err(DomainError::NameAlreadyExists { .. })));
    }
}
