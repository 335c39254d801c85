use crate::graph::Position;
use crate::schema::SchemaField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// The UI-restorable snapshot of a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfiguration {
    pub id: String,
    pub name: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub nodes: NodeCollections,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub execution: ExecutionPlan,
    #[serde(default)]
    pub metadata: ConfigurationMetadata,
}

impl MappingConfiguration {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Every node id across the four categories, in category order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        let n = &self.nodes;
        n.sources
            .iter()
            .map(|s| s.id.as_str())
            .chain(n.targets.iter().map(|t| t.id.as_str()))
            .chain(n.transforms.iter().map(|t| t.id.as_str()))
            .chain(n.mappings.iter().map(|m| m.id.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeCollections {
    pub sources: Vec<SchemaNodeConfig>,
    pub targets: Vec<SchemaNodeConfig>,
    pub transforms: Vec<TransformNodeConfig>,
    pub mappings: Vec<ValueMapNodeConfig>,
}

/// A source or target node: `{id, label, position, schema: {fields}, sampleData}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNodeConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub schema: SchemaDefinition,
    #[serde(default, alias = "outputData", skip_serializing_if = "Vec::is_empty")]
    pub sample_data: Vec<Value>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub expanded_fields: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

/// A transform node with its parameters in the stable `config.parameters` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformNodeConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub config: TransformConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub parameters: Value,
}

/// A lookup-table node and the source field it translates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueMapNodeConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub table: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Direct,
    Transform,
    Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    pub target_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
}

/// Transform and lookup nodes in dependency order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionPlan {
    #[serde(default)]
    pub steps: Vec<ExecutionStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub node_id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Upstream node ids feeding this step, in edge order.
    #[serde(default)]
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub source_count: usize,
    pub target_count: usize,
    pub transform_count: usize,
    pub mapping_count: usize,
    pub connection_count: usize,
}
