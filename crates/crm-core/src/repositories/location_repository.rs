//! Location repository trait (port)
//!
//! Adapters keep the nested-set bounds consistent: inserts and subtree
//! deletes take an exclusive lock on the table before reading bounds.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Location, NewLocation};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Location>, DomainError>;
    /// Every location, ordered by `lft`.
    async fn all(&self) -> Result<Vec<Location>, DomainError>;
    /// The node and its descendants, ordered by `lft`.
    async fn subtree(&self, id: &Uuid) -> Result<Vec<Location>, DomainError>;
    /// Ancestors from the root down, excluding the node itself.
    async fn ancestors(&self, id: &Uuid) -> Result<Vec<Location>, DomainError>;
    /// Appends a new root after the last existing tree.
    async fn insert_root(&self, input: NewLocation) -> Result<Location, DomainError>;
    /// Appends a new last child under `parent_id`.
    async fn insert_child(&self, parent_id: &Uuid, input: NewLocation) -> Result<Location, DomainError>;
    async fn rename(&self, id: &Uuid, name: &str) -> Result<Location, DomainError>;
    /// Removes the node and its descendants; returns the number of rows removed.
    async fn delete_subtree(&self, id: &Uuid) -> Result<u64, DomainError>;
}
