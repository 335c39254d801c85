use super::migrate;
use crate::error::NodeShapeError;
use crate::rules::TransformOp;
use crate::schema::SchemaField;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Macro that defines the closed set of node types and their wire discriminants.
macro_rules! define_node_types {
    ( $( ($variant:ident, $name:literal $(, $alias:literal)* ) ),* $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeType {
            $( $variant, )*
        }

        impl NodeType {
            pub const ALL: &'static [NodeType] = &[ $( NodeType::$variant, )* ];

            /// The canonical `type` string written to canvas documents.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( NodeType::$variant => $name, )*
                }
            }

            /// Resolves a `type` string, accepting historical aliases.
            pub fn from_type_name(name: &str) -> Option<Self> {
                match name {
                    $( $name $( | $alias )* => Some(NodeType::$variant), )*
                    _ => None,
                }
            }
        }
    };
}

define_node_types! {
    (Source, "source"),
    (Target, "target"),
    (ValueMap, "conversionMapping", "mapping"),
    (Direct, "directTransform", "direct"),
    (Static, "staticValue", "static"),
    (Conditional, "ifThen", "conditional"),
    (StringOperation, "transform"),
    (Split, "splitterTransform", "split"),
    (Concat, "concatTransform", "concat"),
    (DateConversion, "dateConversion", "date_conversion"),
    (Coalesce, "coalesceTransform", "coalesce"),
}

impl NodeType {
    /// Source, target and value-map nodes are structural; every other type is a transform.
    pub fn is_structural(self) -> bool {
        matches!(self, NodeType::Source | NodeType::Target | NodeType::ValueMap)
    }
}

/// Data carried by source and target nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaNodeData {
    pub label: String,
    pub fields: Vec<SchemaField>,
    #[serde(alias = "outputData", skip_serializing_if = "Vec::is_empty")]
    pub sample_data: Vec<Value>,
    /// Dot paths of container fields shown expanded on the canvas.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub expanded_fields: BTreeSet<String>,
}

impl SchemaNodeData {
    pub fn new(label: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self {
            label: label.into(),
            fields,
            ..Default::default()
        }
    }
}

/// Data carried by a lookup-table node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueMapData {
    pub label: String,
    pub table: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
}

/// The variant-specific part of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Source(SchemaNodeData),
    Target(SchemaNodeData),
    ValueMap(ValueMapData),
    Transform { label: String, op: TransformOp },
    /// A node type this crate does not know; its data is preserved untouched.
    Other { type_name: String, data: Value },
}

impl NodeKind {
    pub fn node_type(&self) -> Option<NodeType> {
        let node_type = match self {
            NodeKind::Source(_) => NodeType::Source,
            NodeKind::Target(_) => NodeType::Target,
            NodeKind::ValueMap(_) => NodeType::ValueMap,
            NodeKind::Transform { op, .. } => match op {
                TransformOp::Direct => NodeType::Direct,
                TransformOp::Static(_) => NodeType::Static,
                TransformOp::Conditional(_) => NodeType::Conditional,
                TransformOp::StringOperation(_) => NodeType::StringOperation,
                TransformOp::Split(_) => NodeType::Split,
                TransformOp::Concat(_) => NodeType::Concat,
                TransformOp::DateConversion(_) => NodeType::DateConversion,
                TransformOp::Coalesce(_) => NodeType::Coalesce,
            },
            NodeKind::Other { .. } => return None,
        };
        Some(node_type)
    }

    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Other { type_name, .. } => type_name.as_str(),
            known => known.node_type().map(NodeType::as_str).unwrap_or_default(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NodeKind::Source(d) | NodeKind::Target(d) => d.label.as_str(),
            NodeKind::ValueMap(d) => d.label.as_str(),
            NodeKind::Transform { label, .. } => label.as_str(),
            NodeKind::Other { data, .. } => data.get("label").and_then(Value::as_str).unwrap_or_default(),
        }
    }

    /// Transform-like nodes: anything that is not source, target or value map.
    pub fn is_transform(&self) -> bool {
        !self.node_type().is_some_and(NodeType::is_structural)
    }

    pub fn schema(&self) -> Option<&SchemaNodeData> {
        match self {
            NodeKind::Source(d) | NodeKind::Target(d) => Some(d),
            _ => None,
        }
    }
}

/// A canvas node: `{id, type, position, data}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    pub id: String,
    pub position: Position,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<String>, position: Position, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            position,
            kind,
        }
    }

    pub fn source(id: impl Into<String>, position: Position, data: SchemaNodeData) -> Self {
        Self::new(id, position, NodeKind::Source(data))
    }

    pub fn target(id: impl Into<String>, position: Position, data: SchemaNodeData) -> Self {
        Self::new(id, position, NodeKind::Target(data))
    }

    pub fn transform(id: impl Into<String>, position: Position, label: impl Into<String>, op: TransformOp) -> Self {
        Self::new(
            id,
            position,
            NodeKind::Transform {
                label: label.into(),
                op,
            },
        )
    }

    pub fn value_map(id: impl Into<String>, position: Position, data: ValueMapData) -> Self {
        Self::new(id, position, NodeKind::ValueMap(data))
    }

    pub fn node_type(&self) -> Option<NodeType> {
        self.kind.node_type()
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

/// The wire form of a node before its `data` is normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: Value,
}

impl TryFrom<RawNode> for Node {
    type Error = NodeShapeError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let kind = migrate::node_kind(&raw.id, &raw.type_name, &raw.data)?;
        Ok(Node {
            id: raw.id,
            position: raw.position,
            kind,
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        RawNode {
            type_name: node.type_name().to_string(),
            data: migrate::node_data(&node.kind),
            id: node.id,
            position: node.position,
        }
    }
}
