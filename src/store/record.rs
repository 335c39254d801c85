use super::version::Version;
use crate::config::MappingConfiguration;
use crate::rules::ExecutionMappingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted mapping version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedMapping {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub transform_type: Option<String>,
    pub mapping_group_id: String,
    pub ui_config: MappingConfiguration,
    pub execution_config: ExecutionMappingConfig,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedMapping {
    pub fn version(&self) -> Version {
        Version::new(self.version.as_str())
    }

    /// Sets the mapping name on the record and on both embedded configs.
    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
        self.ui_config.name = name.to_string();
        self.execution_config.name = Some(name.to_string());
    }
}

/// How a filter treats the nullable `category` column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    Any,
    /// Null-safe equality: `Is(None)` matches only records without a category.
    Is(Option<String>),
}

/// Row selection for the persistence collaborator. Unset fields match anything.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappingFilter {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub category: CategoryFilter,
    pub mapping_group_id: Option<String>,
    pub is_active: Option<bool>,
}

impl MappingFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = CategoryFilter::Is(category);
        self
    }
    pub fn group(mut self, mapping_group_id: impl Into<String>) -> Self {
        self.mapping_group_id = Some(mapping_group_id.into());
        self
    }
    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn matches(&self, record: &SavedMapping) -> bool {
        let eq = |wanted: &Option<String>, actual: &str| wanted.as_deref().is_none_or(|w| w == actual);
        eq(&self.id, &record.id)
            && eq(&self.user_id, &record.user_id)
            && eq(&self.name, &record.name)
            && eq(&self.mapping_group_id, &record.mapping_group_id)
            && self.is_active.is_none_or(|a| a == record.is_active)
            && match &self.category {
                CategoryFilter::Any => true,
                CategoryFilter::Is(category) => *category == record.category,
            }
    }
}

/// Column updates. `None` leaves a column unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappingPatch {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub ui_config: Option<MappingConfiguration>,
    pub execution_config: Option<ExecutionMappingConfig>,
}

impl MappingPatch {
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Default::default()
        }
    }

    pub fn apply(self, record: &mut SavedMapping, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(is_active) = self.is_active {
            record.is_active = is_active;
        }
        if let Some(ui_config) = self.ui_config {
            record.ui_config = ui_config;
        }
        if let Some(execution_config) = self.execution_config {
            record.execution_config = execution_config;
        }
        record.updated_at = now;
    }
}
