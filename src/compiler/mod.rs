use crate::config::{
    ConfigurationMetadata, Connection, ConnectionKind, ExecutionPlan, MappingConfiguration, NodeCollections,
    SchemaDefinition, SchemaNodeConfig, TransformConfig, TransformNodeConfig, ValueMapNodeConfig,
};
use crate::graph::{Graph, Node, NodeKind, SchemaNodeData};
use crate::rules::ExecutionMappingConfig;
use crate::schema::{collect_array_configs, walk_fields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

mod diagnostics;
mod plan;
mod resolver;

pub use diagnostics::ResolutionWarning;
use resolver::Resolver;

/// Tunables for graph export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Hop limit of the backward walk from a target field to its source field.
    pub max_resolve_depth: usize,
    /// Version written into a configuration when none is given.
    pub default_version: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            max_resolve_depth: 32,
            default_version: "1.0".to_string(),
        }
    }
}

/// Everything produced from one graph.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub ui: MappingConfiguration,
    pub execution: ExecutionMappingConfig,
    pub warnings: Vec<ResolutionWarning>,
}

/// Compiles a canvas graph into a UI snapshot and a flat execution configuration.
pub struct Exporter {
    options: ExportOptions,
    id: Option<String>,
    name: String,
    version: Option<String>,
    created_at: Option<DateTime<Utc>>,
    description: Option<String>,
    tags: Vec<String>,
}

pub struct ExporterBuilder {
    exporter: Exporter,
}

impl ExporterBuilder {
    pub fn new() -> Self {
        Self {
            exporter: Exporter {
                options: ExportOptions::default(),
                id: None,
                name: String::new(),
                version: None,
                created_at: None,
                description: None,
                tags: Vec::new(),
            },
        }
    }
    pub fn options(mut self, options: ExportOptions) -> Self {
        self.exporter.options = options;
        self
    }
    pub fn max_resolve_depth(mut self, depth: usize) -> Self {
        self.exporter.options.max_resolve_depth = depth;
        self
    }
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.exporter.id = Some(id.into());
        self
    }
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.exporter.name = name.into();
        self
    }
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.exporter.version = Some(version.into());
        self
    }
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.exporter.created_at = Some(created_at);
        self
    }
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.exporter.description = Some(description.into());
        self
    }
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.exporter.tags = tags;
        self
    }
    pub fn build(self) -> Exporter {
        self.exporter
    }
}

impl Default for ExporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter {
    pub fn builder() -> ExporterBuilder {
        ExporterBuilder::new()
    }

    fn version(&self) -> String {
        self.version
            .clone()
            .unwrap_or_else(|| self.options.default_version.clone())
    }

    pub fn export(&self, graph: &Graph) -> ExportOutput {
        let mut warnings = Vec::new();
        let ui = self.build_ui(graph, &mut warnings);
        let execution = self.build_execution(graph, &mut warnings);
        ExportOutput {
            ui,
            execution,
            warnings,
        }
    }

    pub fn export_ui(&self, graph: &Graph) -> (MappingConfiguration, Vec<ResolutionWarning>) {
        let mut warnings = Vec::new();
        let ui = self.build_ui(graph, &mut warnings);
        (ui, warnings)
    }

    pub fn export_execution(&self, graph: &Graph) -> (ExecutionMappingConfig, Vec<ResolutionWarning>) {
        let mut warnings = Vec::new();
        let execution = self.build_execution(graph, &mut warnings);
        (execution, warnings)
    }

    fn build_ui(&self, graph: &Graph, warnings: &mut Vec<ResolutionWarning>) -> MappingConfiguration {
        let mut nodes = NodeCollections::default();

        for node in graph.nodes() {
            match &node.kind {
                NodeKind::Source(data) => nodes.sources.push(schema_config(node, data)),
                NodeKind::Target(data) => nodes.targets.push(schema_config(node, data)),
                NodeKind::ValueMap(data) => nodes.mappings.push(ValueMapNodeConfig {
                    id: node.id.clone(),
                    label: data.label.clone(),
                    position: node.position,
                    table: data.table.clone(),
                    source_field: data.source_field.clone(),
                }),
                NodeKind::Transform { label, op } => nodes.transforms.push(TransformNodeConfig {
                    id: node.id.clone(),
                    type_name: node.type_name().to_string(),
                    label: label.clone(),
                    position: node.position,
                    config: TransformConfig {
                        parameters: op.parameters(),
                    },
                }),
                NodeKind::Other { type_name, data } => {
                    let warning = ResolutionWarning::UnknownNodeType {
                        node_id: node.id.clone(),
                        type_name: type_name.clone(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    nodes.transforms.push(TransformNodeConfig {
                        id: node.id.clone(),
                        type_name: type_name.clone(),
                        label: node.kind.label().to_string(),
                        position: node.position,
                        config: TransformConfig {
                            parameters: data.clone(),
                        },
                    });
                }
            }
        }

        let connections = self.connections(graph, warnings);
        let steps = plan::execution_steps(graph, warnings);

        let metadata = ConfigurationMetadata {
            description: self.description.clone(),
            tags: self.tags.clone(),
            source_count: nodes.sources.len(),
            target_count: nodes.targets.len(),
            transform_count: nodes.transforms.len(),
            mapping_count: nodes.mappings.len(),
            connection_count: connections.len(),
        };

        MappingConfiguration {
            id: self
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name.clone(),
            version: self.version(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
            nodes,
            connections,
            execution: ExecutionPlan { steps },
            metadata,
        }
    }

    /// Converts edges into typed connections; edges touching unknown nodes are dropped.
    fn connections(&self, graph: &Graph, warnings: &mut Vec<ResolutionWarning>) -> Vec<Connection> {
        graph
            .edges()
            .iter()
            .filter_map(|edge| {
                let missing = [&edge.source, &edge.target]
                    .into_iter()
                    .find(|id| !graph.contains_node(id));
                if let Some(node_id) = missing {
                    let warning = ResolutionWarning::UnknownNode {
                        edge_id: edge.id.clone(),
                        node_id: node_id.clone(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    return None;
                }

                let kind = match graph.node(&edge.source).map(|n| &n.kind) {
                    Some(NodeKind::Source(_)) => ConnectionKind::Direct,
                    Some(NodeKind::ValueMap(_)) => ConnectionKind::Mapping,
                    _ => ConnectionKind::Transform,
                };
                Some(Connection {
                    id: edge.id.clone(),
                    source_node_id: edge.source.clone(),
                    source_handle: edge.source_handle.clone(),
                    target_node_id: edge.target.clone(),
                    target_handle: edge.target_handle.clone(),
                    kind,
                })
            })
            .collect()
    }

    /// Emits one rule per resolvable edge, in target-node, target-field, edge order.
    fn build_execution(&self, graph: &Graph, warnings: &mut Vec<ResolutionWarning>) -> ExecutionMappingConfig {
        let resolver = Resolver::new(graph, self.options.max_resolve_depth);
        let mut mappings = Vec::new();
        let mut arrays = Vec::new();

        for target in graph.nodes_where(|kind| matches!(kind, NodeKind::Target(_))) {
            let Some(data) = target.kind.schema() else {
                continue;
            };
            arrays.extend(collect_array_configs(&data.fields));

            for field in walk_fields(&data.fields) {
                for edge in graph.incoming_at(&target.id, &field.id) {
                    match resolver.resolve(edge, &field.name) {
                        Ok(mapping) => {
                            debug!(edge = %edge.id, to = %mapping.to, rule = mapping.rule.type_name(), "Resolved mapping");
                            mappings.push(mapping);
                        }
                        Err(warning) => {
                            warn!(edge = %edge.id, "Skipping edge: {}", warning);
                            warnings.push(warning);
                        }
                    }
                }
            }
        }

        ExecutionMappingConfig {
            name: (!self.name.is_empty()).then(|| self.name.clone()),
            version: Some(self.version()),
            mappings,
            arrays,
        }
    }
}

fn schema_config(node: &Node, data: &SchemaNodeData) -> SchemaNodeConfig {
    SchemaNodeConfig {
        id: node.id.clone(),
        label: data.label.clone(),
        position: node.position,
        schema: SchemaDefinition {
            fields: data.fields.clone(),
        },
        sample_data: data.sample_data.clone(),
        expanded_fields: data.expanded_fields.clone(),
    }
}
