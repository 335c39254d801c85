//! Versioned, grouped mapping records with one active version per group.
//!
//! Every saved mapping belongs to a mapping group: all versions ever saved
//! under one logical name. Within a `(user, group)` partition at most one
//! record is active. Activation always deactivates first and activates second,
//! so an interrupted call leaves a group with no active version rather than two.
//!
//! The store assumes a single writer per group. Two concurrent `save` or
//! `activate_version` calls on the same group may interleave between the
//! deactivate and activate steps; nothing here guards against that.

use crate::config::MappingConfiguration;
use crate::error::{PersistenceError, StoreError};
use crate::rules::ExecutionMappingConfig;
use chrono::Utc;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::{debug, info, warn};

pub mod memory;
pub mod record;
pub mod repository;
pub mod version;

pub use memory::MemoryRepository;
pub use record::*;
pub use repository::MappingRepository;
pub use version::Version;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Version given to copies, which always start a new group.
    pub bootstrap_version: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bootstrap_version: "1.0".to_string(),
        }
    }
}

/// Input to [`MappingStore::save`]. Unset descriptive fields are inherited
/// from the active version with the same name.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub name: String,
    pub ui_config: MappingConfiguration,
    pub execution_config: ExecutionMappingConfig,
    pub category: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub transform_type: Option<String>,
}

impl SaveRequest {
    pub fn new(
        name: impl Into<String>,
        ui_config: MappingConfiguration,
        execution_config: ExecutionMappingConfig,
    ) -> Self {
        Self {
            name: name.into(),
            ui_config,
            execution_config,
            category: None,
            version: None,
            description: None,
            tags: None,
            transform_type: None,
        }
    }
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
    pub fn with_transform_type(mut self, transform_type: impl Into<String>) -> Self {
        self.transform_type = Some(transform_type.into());
        self
    }
}

/// The versioning and activation operations of one user.
pub struct MappingStore<R: MappingRepository> {
    repository: R,
    user_id: Option<String>,
    config: StoreConfig,
}

impl<R: MappingRepository> MappingStore<R> {
    pub fn for_user(repository: R, user_id: impl Into<String>) -> Self {
        Self {
            repository,
            user_id: Some(user_id.into()),
            config: StoreConfig::default(),
        }
    }

    /// A store without a signed-in user. Every operation fails with `Unauthenticated`.
    pub fn anonymous(repository: R) -> Self {
        Self {
            repository,
            user_id: None,
            config: StoreConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    fn user(&self) -> Result<&str, StoreError> {
        self.user_id.as_deref().ok_or(StoreError::Unauthenticated)
    }

    /// Saves a new version and makes it the only active one in its group.
    pub async fn save(&self, request: SaveRequest) -> Result<SavedMapping, StoreError> {
        let user = self.user()?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("mapping name must not be empty".to_string()));
        }

        let active = self
            .repository
            .get_active_mapping(user, name, None)
            .await
            .map_err(StoreError::at("Failed to look up active mapping"))?;

        let (group, category, description, tags, transform_type) = match active {
            Some(active) => {
                debug!(group = %active.mapping_group_id, version = %active.version, "Saving into existing group");
                (
                    active.mapping_group_id,
                    request.category.or(active.category),
                    request.description.or(active.description),
                    request.tags.unwrap_or(active.tags),
                    request.transform_type.or(active.transform_type),
                )
            }
            None => {
                self.ensure_name_free(user, name, None).await?;
                (
                    uuid::Uuid::new_v4().to_string(),
                    request.category,
                    request.description,
                    request.tags.unwrap_or_default(),
                    request.transform_type,
                )
            }
        };

        let version = match request.version {
            Some(version) => version,
            None => self
                .repository
                .get_next_version(user, name, category.as_deref())
                .await
                .map_err(StoreError::at("Failed to determine next version"))?,
        };

        let deactivated = self
            .repository
            .update_where(
                &MappingFilter::for_user(user).group(group.as_str()).active(true),
                MappingPatch::active(false),
            )
            .await
            .map_err(StoreError::at("Failed to deactivate previous versions"))?;

        let now = Utc::now();
        let mut record = SavedMapping {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.to_string(),
            name: name.to_string(),
            version: version.clone(),
            category,
            description,
            tags,
            transform_type,
            mapping_group_id: group,
            ui_config: request.ui_config,
            execution_config: request.execution_config,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        record.rename(name);
        record.ui_config.version = version.clone();
        record.execution_config.version = Some(version);

        let saved = self
            .repository
            .insert(record)
            .await
            .map_err(StoreError::at("Failed to save mapping"))?;
        info!(
            id = %saved.id,
            group = %saved.mapping_group_id,
            version = %saved.version,
            deactivated,
            "Saved mapping version"
        );
        Ok(saved)
    }

    /// Makes one version the active one among all records sharing its name and category.
    ///
    /// Category matching is null-safe: `None` matches only uncategorized records.
    pub async fn activate_version(
        &self,
        id: &str,
        name: &str,
        category: Option<&str>,
    ) -> Result<SavedMapping, StoreError> {
        let user = self.user()?;
        self.get_mapping(id).await?;

        let filter = MappingFilter::for_user(user)
            .name(name)
            .category(category.map(str::to_string));
        let deactivated = self
            .repository
            .update_where(&filter, MappingPatch::active(false))
            .await
            .map_err(StoreError::at("Failed to deactivate other versions"))?;

        let activated = self
            .repository
            .update(id, MappingPatch::active(true))
            .await
            .map_err(not_found_or("Failed to activate version"))?;
        info!(id, deactivated, version = %activated.version, "Activated mapping version");
        Ok(activated)
    }

    /// Copies a mapping into a new group under a new name, starting at the bootstrap version.
    pub async fn copy_mapping(&self, id: &str, new_name: &str) -> Result<SavedMapping, StoreError> {
        let user = self.user()?;
        let original = self.get_mapping(id).await?;
        self.ensure_name_free(user, new_name, None).await?;

        let now = Utc::now();
        let version = self.config.bootstrap_version.clone();
        let mut copy = SavedMapping {
            id: uuid::Uuid::new_v4().to_string(),
            mapping_group_id: uuid::Uuid::new_v4().to_string(),
            version: version.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
            ..original
        };
        copy.rename(new_name);
        copy.ui_config.version = version.clone();
        copy.execution_config.version = Some(version);

        let saved = self
            .repository
            .insert(copy)
            .await
            .map_err(StoreError::at("Failed to copy mapping"))?;
        info!(from = id, id = %saved.id, name = new_name, "Copied mapping");
        Ok(saved)
    }

    /// Renames every version of a mapping's group and sets their category.
    pub async fn update_mapping(
        &self,
        id: &str,
        name: &str,
        category: Option<String>,
    ) -> Result<Vec<SavedMapping>, StoreError> {
        let user = self.user()?;
        let record = self.get_mapping(id).await?;
        self.ensure_name_free(user, name, Some(record.mapping_group_id.as_str())).await?;

        let versions = self
            .repository
            .select(&MappingFilter::for_user(user).group(record.mapping_group_id.as_str()))
            .await
            .map_err(StoreError::at("Failed to load mapping versions"))?;

        let mut updated = Vec::with_capacity(versions.len());
        for mut version in versions {
            version.rename(name);
            let patch = MappingPatch {
                name: Some(name.to_string()),
                category: Some(category.clone()),
                ui_config: Some(version.ui_config),
                execution_config: Some(version.execution_config),
                ..Default::default()
            };
            let saved = self
                .repository
                .update(&version.id, patch)
                .await
                .map_err(StoreError::at("Failed to update mapping"))?;
            updated.push(saved);
        }
        info!(group = %record.mapping_group_id, name, versions = updated.len(), "Renamed mapping group");
        Ok(updated)
    }

    /// One record per group: the active version, else the highest version.
    /// Most recently updated first.
    pub async fn get_latest_mappings(&self) -> Result<Vec<SavedMapping>, StoreError> {
        let user = self.user()?;
        let records = self
            .repository
            .select(&MappingFilter::for_user(user))
            .await
            .map_err(StoreError::at("Failed to load mappings"))?;

        let latest = records
            .into_iter()
            .into_group_map_by(|r| r.mapping_group_id.clone())
            .into_values()
            .filter_map(|mut versions| {
                let group = versions.first().map(|v| v.mapping_group_id.clone());
                let active = versions.iter().filter(|v| v.is_active).count();
                if active > 1 {
                    warn!(group = ?group, active, "Mapping group has more than one active version");
                }
                versions.sort_by_key(|v| (v.is_active, v.version()));
                versions.pop()
            })
            .sorted_by_key(|r| Reverse(r.updated_at))
            .collect();
        Ok(latest)
    }

    pub async fn get_mapping(&self, id: &str) -> Result<SavedMapping, StoreError> {
        let user = self.user()?;
        self.repository
            .select(&MappingFilter::for_user(user).id(id))
            .await
            .map_err(StoreError::at("Failed to load mapping"))?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Every version in a mapping's group, highest version first.
    pub async fn list_versions(&self, id: &str) -> Result<Vec<SavedMapping>, StoreError> {
        let user = self.user()?;
        let record = self.get_mapping(id).await?;
        let mut versions = self
            .repository
            .select(&MappingFilter::for_user(user).group(record.mapping_group_id))
            .await
            .map_err(StoreError::at("Failed to load mapping versions"))?;
        versions.sort_by_key(|v| Reverse(v.version()));
        Ok(versions)
    }

    /// Deletes a single version.
    pub async fn delete_mapping(&self, id: &str) -> Result<(), StoreError> {
        let record = self.get_mapping(id).await?;
        self.repository
            .delete(&record.id)
            .await
            .map_err(not_found_or("Failed to delete mapping"))?;
        if record.is_active {
            warn!(id, group = %record.mapping_group_id, "Deleted the active version; group has no active version");
        }
        info!(id, "Deleted mapping");
        Ok(())
    }

    /// Fails when `name` is used by any group other than `own_group`.
    async fn ensure_name_free(&self, user: &str, name: &str, own_group: Option<&str>) -> Result<(), StoreError> {
        let existing = self
            .repository
            .select(&MappingFilter::for_user(user).name(name))
            .await
            .map_err(StoreError::at("Failed to check mapping name"))?;
        if existing
            .iter()
            .any(|r| own_group != Some(r.mapping_group_id.as_str()))
        {
            return Err(StoreError::NameConflict { name: name.to_string() });
        }
        Ok(())
    }
}

fn not_found_or(stage: &'static str) -> impl FnOnce(PersistenceError) -> StoreError {
    move |error| match error {
        PersistenceError::NotFound(id) => StoreError::NotFound(id),
        other => StoreError::at(stage)(other),
    }
}
