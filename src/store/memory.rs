use super::record::{MappingFilter, MappingPatch, SavedMapping};
use super::repository::MappingRepository;
use super::version::Version;
use crate::error::PersistenceError;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-process mapping table.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: RwLock<Vec<SavedMapping>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SavedMapping>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// A copy of every stored record in insertion order.
    pub async fn snapshot(&self) -> Vec<SavedMapping> {
        self.records.read().await.clone()
    }

    fn matching<'a>(
        records: &'a [SavedMapping],
        user_id: &'a str,
        name: &'a str,
        category: Option<&'a str>,
    ) -> impl Iterator<Item = &'a SavedMapping> {
        records.iter().filter(move |r| {
            r.user_id == user_id && r.name == name && category.is_none_or(|c| r.category.as_deref() == Some(c))
        })
    }
}

#[async_trait]
impl MappingRepository for MemoryRepository {
    async fn insert(&self, record: SavedMapping) -> Result<SavedMapping, PersistenceError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(PersistenceError::Backend(format!("duplicate key '{}'", record.id)));
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: MappingPatch) -> Result<SavedMapping, PersistenceError> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        patch.apply(record, Utc::now());
        Ok(record.clone())
    }

    async fn update_where(&self, filter: &MappingFilter, patch: MappingPatch) -> Result<usize, PersistenceError> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let mut changed = 0;
        for record in records.iter_mut().filter(|r| filter.matches(r)) {
            patch.clone().apply(record, now);
            changed += 1;
        }
        debug!(changed, "Updated matching mapping records");
        Ok(changed)
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(PersistenceError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn select(&self, filter: &MappingFilter) -> Result<Vec<SavedMapping>, PersistenceError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn get_next_version(
        &self,
        user_id: &str,
        name: &str,
        category: Option<&str>,
    ) -> Result<String, PersistenceError> {
        let records = self.records.read().await;
        let next = Self::matching(&records, user_id, name, category)
            .map(SavedMapping::version)
            .max()
            .map(|v| v.next_minor())
            .unwrap_or_else(|| Version::new("1.0"));
        Ok(next.to_string())
    }

    async fn get_active_mapping(
        &self,
        user_id: &str,
        name: &str,
        category: Option<&str>,
    ) -> Result<Option<SavedMapping>, PersistenceError> {
        let records = self.records.read().await;
        Ok(Self::matching(&records, user_id, name, category)
            .find(|r| r.is_active)
            .cloned())
    }
}
