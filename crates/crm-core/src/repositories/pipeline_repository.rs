//! Pipeline and stage repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Pipeline, Stage};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// All pipelines with their stages ordered by position.
    async fn list(&self) -> Result<Vec<Pipeline>, DomainError>;
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Pipeline>, DomainError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Pipeline>, DomainError>;
    async fn find_default(&self) -> Result<Option<Pipeline>, DomainError>;
    /// Inserts the pipeline with its stages; a default pipeline clears the flag elsewhere.
    async fn create(&self, pipeline: &Pipeline) -> Result<Pipeline, DomainError>;
    /// Updates name and default flag; a default pipeline clears the flag elsewhere.
    async fn update(&self, pipeline: &Pipeline) -> Result<Pipeline, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;

    async fn find_stage(&self, id: &Uuid) -> Result<Option<Stage>, DomainError>;
    async fn add_stage(&self, stage: &Stage) -> Result<Stage, DomainError>;
    async fn update_stage(&self, stage: &Stage) -> Result<Stage, DomainError>;
    async fn reorder_stages(&self, pipeline_id: &Uuid, positions: Vec<(Uuid, i32)>) -> Result<(), DomainError>;
    async fn delete_stage(&self, id: &Uuid) -> Result<(), DomainError>;
}
