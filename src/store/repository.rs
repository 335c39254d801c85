use super::record::{MappingFilter, MappingPatch, SavedMapping};
use crate::error::PersistenceError;
use async_trait::async_trait;

/// The persistence collaborator: a table of mapping records plus two server-side procedures.
///
/// Every call is an independent, possibly failing request. Nothing is retried.
#[async_trait]
pub trait MappingRepository: Send + Sync {
    async fn insert(&self, record: SavedMapping) -> Result<SavedMapping, PersistenceError>;

    async fn update(&self, id: &str, patch: MappingPatch) -> Result<SavedMapping, PersistenceError>;

    /// Applies one patch to every matching record and returns how many changed.
    async fn update_where(&self, filter: &MappingFilter, patch: MappingPatch) -> Result<usize, PersistenceError>;

    async fn delete(&self, id: &str) -> Result<(), PersistenceError>;

    async fn select(&self, filter: &MappingFilter) -> Result<Vec<SavedMapping>, PersistenceError>;

    /// The version a new save under `(user, name, category)` should take.
    /// A `None` category matches any category.
    async fn get_next_version(
        &self,
        user_id: &str,
        name: &str,
        category: Option<&str>,
    ) -> Result<String, PersistenceError>;

    /// The active record under `(user, name, category)`. A `None` category matches any category.
    async fn get_active_mapping(
        &self,
        user_id: &str,
        name: &str,
        category: Option<&str>,
    ) -> Result<Option<SavedMapping>, PersistenceError>;
}
