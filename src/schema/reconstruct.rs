use super::field::{FieldType, SchemaField};
use serde::{Deserialize, Serialize};

/// External group-by configuration for one array field, keyed by the target field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayConfig {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, alias = "group_by", skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

impl ArrayConfig {
    pub fn new(target: impl Into<String>, group_by: Option<String>) -> Self {
        Self {
            target: target.into(),
            source: None,
            group_by,
        }
    }
}

/// Restores `groupBy` on every array field from the external array configuration.
///
/// An array field without a matching configuration entry has its `groupBy`
/// cleared, which repairs values left behind by a renamed array. Non-array
/// fields are copied as-is; recursion always descends into children.
pub fn reconstruct_fields(fields: &[SchemaField], array_configs: &[ArrayConfig]) -> Vec<SchemaField> {
    fields
        .iter()
        .map(|field| reconstruct_field(field, array_configs))
        .collect()
}

fn reconstruct_field(field: &SchemaField, array_configs: &[ArrayConfig]) -> SchemaField {
    let mut rebuilt = field.clone();

    if field.field_type == FieldType::Array {
        rebuilt.group_by = array_configs
            .iter()
            .find(|config| config.target == field.name)
            .and_then(|config| config.group_by.clone());
    }

    if let Some(children) = &field.children {
        rebuilt.children = Some(reconstruct_fields(children, array_configs));
    }

    rebuilt
}

/// Collects an array configuration entry for every grouped array field in the forest.
pub fn collect_array_configs(fields: &[SchemaField]) -> Vec<ArrayConfig> {
    super::field::walk_fields(fields)
        .filter(|f| f.field_type == FieldType::Array)
        .filter_map(|f| {
            f.group_by
                .as_ref()
                .map(|group_by| ArrayConfig::new(f.name.clone(), Some(group_by.clone())))
        })
        .collect()
}
