// ============================================================================
// CRM Core - Pipeline & Stage Entities
// File: crates/crm-core/src/domain/pipeline.rs
// Description: Sales pipelines and their ordered stages (tenant database)
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub is_default: bool,
    pub stages: Vec<Stage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub name: String,
    pub position: i32,
    /// Win probability in percent.
    pub probability: i32,
    pub is_won: bool,
    pub is_lost: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewStage {
    #[validate(length(min = 1, max = 100, message = "Stage name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(range(min = 0, max = 100, message = "Probability must be between 0 and 100"))]
    pub probability: i32,
    #[serde(default)]
    pub is_won: bool,
    #[serde(default)]
    pub is_lost: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StageChanges {
    #[validate(length(min = 1, max = 100, message = "Stage name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 0, max = 100, message = "Probability must be between 0 and 100"))]
    pub probability: Option<i32>,
    pub is_won: Option<bool>,
    pub is_lost: Option<bool>,
}

pub fn validate_pipeline_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err(DomainError::ValidationError(
            "Pipeline name must be between 1 and 100 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

impl Pipeline {
    pub fn new(name: &str, is_default: bool) -> Result<Self, DomainError> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: validate_pipeline_name(name)?,
            is_default,
            stages: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Pipeline seeded into every new tenant.
    pub fn default_sales() -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let stages = [
            ("New", 10, false, false),
            ("Qualified", 25, false, false),
            ("Proposal", 50, false, false),
            ("Negotiation", 75, false, false),
            ("Won", 100, true, false),
            ("Lost", 0, false, true),
        ]
        .iter()
        .enumerate()
        .map(|(position, (name, probability, is_won, is_lost))| Stage {
            id: Uuid::new_v4(),
            pipeline_id: id,
            name: name.to_string(),
            position: position as i32,
            probability: *probability,
            is_won: *is_won,
            is_lost: *is_lost,
        })
        .collect();

        Self {
            id,
            name: "Sales".to_string(),
            is_default: true,
            stages,
            created_at: now,
            updated_at: now,
        }
    }

    /// First stage that is neither won nor lost.
    pub fn entry_stage(&self) -> Option<&Stage> {
        let mut open: Vec<&Stage> = self.stages.iter().filter(|s| !s.is_won && !s.is_lost).collect();
        open.sort_by_key(|s| s.position);
        open.first().copied()
    }

    /// Positions for `ordered_ids`, which must be a permutation of the current stages.
    pub fn reorder(&self, ordered_ids: &[Uuid]) -> Result<Vec<(Uuid, i32)>, DomainError> {
        let mut current: Vec<Uuid> = self.stages.iter().map(|s| s.id).collect();
        let mut requested = ordered_ids.to_vec();
        current.sort();
        requested.sort();
        if current != requested {
            return Err(DomainError::ValidationError(
                "stage order must list every stage of the pipeline exactly once".to_string(),
            ));
        }
        Ok(ordered_ids
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position as i32))
            .collect())
    }
}

impl Stage {
    pub fn new(pipeline_id: Uuid, input: NewStage, position: i32) -> Result<Self, DomainError> {
        input.validate()?;
        if input.is_won && input.is_lost {
            return Err(DomainError::ValidationError(
                "a stage cannot be both won and lost".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            pipeline_id,
            name: input.name.trim().to_string(),
            position,
            probability: input.probability,
            is_won: input.is_won,
            is_lost: input.is_lost,
        })
    }

    pub fn apply(&mut self, changes: StageChanges) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(probability) = changes.probability {
            self.probability = probability;
        }
        if let Some(is_won) = changes.is_won {
            self.is_won = is_won;
        }
        if let Some(is_lost) = changes.is_lost {
            self.is_lost = is_lost;
        }
        if self.is_won && self.is_lost {
            return Err(DomainError::ValidationError(
                "a stage cannot be both won and lost".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_entry_stage() {
        let pipeline = Pipeline::default_sales();
        assert_eq!(pipeline.stages.len(), 6);
        assert_eq!(pipeline.entry_stage().map(|s| s.name.as_str()), Some("New"));
        assert!(pipeline.stages.iter().all(|s| s.pipeline_id == pipeline.id));
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let pipeline = Pipeline::default_sales();
        let mut ids: Vec<Uuid> = pipeline.stages.iter().map(|s| s.id).collect();
        ids.reverse();
        let positions = pipeline.reorder(&ids).unwrap();
        assert_eq!(positions[0], (ids[0], 0));
        assert_eq!(positions[5], (ids[5], 5));

        ids.pop();
        assert!(pipeline.reorder(&ids).is_err());
    }

    #[test]
    fn test_stage_cannot_be_won_and_lost() {
        let input = NewStage {
            name: "Limbo".to_string(),
            probability: 50,
            is_won: true,
            is_lost: true,
        };
        assert!(Stage::new(Uuid::new_v4(), input, 0).is_err());
    }
}
