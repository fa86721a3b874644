//! Location hierarchy service (nested set)

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::{Location, LocationTree, NewLocation};
use crate::error::DomainError;
use crate::repositories::LocationRepository;

pub struct LocationService<R: LocationRepository> {
    repo: Arc<R>,
}

impl<R: LocationRepository> LocationService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Countries are roots; governorates and cities need a parent one level up.
    pub async fn create(&self, input: NewLocation) -> Result<Location, DomainError> {
        let location = match input.parent_id {
            Some(parent_id) => {
                let parent = self.get(&parent_id).await?;
                input.check_parent(Some(&parent))?;
                self.repo.insert_child(&parent.id, input).await?
            }
            None => {
                input.check_parent(None)?;
                self.repo.insert_root(input).await?
            }
        };
        info!("Location created: {} ({})", location.name, location.kind);
        Ok(location)
    }

    pub async fn get(&self, id: &Uuid) -> Result<Location, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("location", id))
    }

    /// Whole forest, or the subtree under `root`.
    pub async fn tree(&self, root: Option<Uuid>) -> Result<Vec<LocationTree>, DomainError> {
        let rows = match root {
            Some(id) => {
                let rows = self.repo.subtree(&id).await?;
                if rows.is_empty() {
                    return Err(DomainError::not_found("location", id));
                }
                rows
            }
            None => self.repo.all().await?,
        };
        Ok(LocationTree::build(rows))
    }

    pub async fn ancestors(&self, id: &Uuid) -> Result<Vec<Location>, DomainError> {
        let location = self.get(id).await?;
        self.repo.ancestors(&location.id).await
    }

    pub async fn descendants(&self, id: &Uuid) -> Result<Vec<Location>, DomainError> {
        let location = self.get(id).await?;
        let rows = self.repo.subtree(&location.id).await?;
        Ok(rows.into_iter().filter(|l| location.is_ancestor_of(l)).collect())
    }

    pub async fn rename(&self, id: &Uuid, name: &str) -> Result<Location, DomainError> {
        let name = name.trim();
        if name.is_empty() || name.len() > 100 {
            return Err(DomainError::ValidationError(
                "Location name must be between 1 and 100 characters".to_string(),
            ));
        }
        let location = self.get(id).await?;
        self.repo.rename(&location.id, name).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<u64, DomainError> {
        let location = self.get(id).await?;
        let removed = self.repo.delete_subtree(&location.id).await?;
        info!("Location {} deleted with {} rows", location.name, removed);
        Ok(removed)
    }
}
