//! Rebuilding a canvas graph from saved configurations.
//!
//! Importing into an interactive canvas happens in two phases. Phase one builds
//! every node, including the expansion hints that make nested source fields
//! visible, and clears the canvas edges. Only once the canvas reports that those
//! nodes exist (by returning [`NodesMaterialized`]) are the edges applied, since
//! an edge pointing at a handle the canvas has not rendered yet is discarded.

use crate::config::{MappingConfiguration, SchemaNodeConfig, TransformNodeConfig};
use crate::error::ImportError;
use crate::graph::migrate::{self, config_payload};
use crate::graph::{
    Column, Edge, Graph, LayoutOptions, Node, NodeKind, NodeType, SchemaNodeData, ValueMapData,
};
use crate::rules::{
    ConditionalParams, ExecutionMapping, ExecutionMappingConfig, FieldTransform, MappingRule,
    SplitParams, StaticEntry, StaticParams, StringOperation, StringOperationParams, TransformOp,
};
use crate::schema::{ArrayConfig, FieldType, SchemaField, reconstruct_fields};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

mod expansion;

pub use expansion::expansion_paths;

/// Proof that a canvas has rendered the nodes of a staged import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodesMaterialized {
    node_count: usize,
}

impl NodesMaterialized {
    /// Called by the rendering layer once the nodes it was given are on screen.
    pub fn observed(node_count: usize) -> Self {
        Self { node_count }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }
}

/// The consuming side of an interactive import.
pub trait Canvas {
    fn clear_edges(&mut self);

    /// Replaces every node and reports back once their handles exist.
    fn set_nodes(&mut self, nodes: Vec<Node>) -> NodesMaterialized;

    fn set_edges(&mut self, edges: Vec<Edge>);
}

/// A graph is its own canvas: nodes exist as soon as they are set.
impl Canvas for Graph {
    fn clear_edges(&mut self) {
        Graph::clear_edges(self);
    }

    fn set_nodes(&mut self, nodes: Vec<Node>) -> NodesMaterialized {
        Graph::set_nodes(self, nodes);
        NodesMaterialized::observed(self.nodes().len())
    }

    fn set_edges(&mut self, edges: Vec<Edge>) {
        Graph::set_edges(self, edges);
    }
}

/// Phase one of an import: nodes are built, edges are held back.
#[derive(Debug, Clone)]
pub struct StagedImport {
    nodes: Vec<Node>,
    pending_edges: Vec<Edge>,
}

impl StagedImport {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn pending_edges(&self) -> &[Edge] {
        &self.pending_edges
    }

    /// Expansion hints attached to a source node.
    pub fn expanded_fields(&self, node_id: &str) -> Option<&BTreeSet<String>> {
        self.nodes
            .iter()
            .find(|n| n.id == node_id)
            .and_then(|n| match &n.kind {
                NodeKind::Source(data) => Some(&data.expanded_fields),
                _ => None,
            })
    }

    /// Phase two: applies the held-back edges once the nodes have materialized.
    pub fn commit(self, materialized: NodesMaterialized) -> Graph {
        log_edges(materialized, &self.pending_edges);
        Graph::new(self.nodes, self.pending_edges)
    }

    /// Runs both phases against a canvas.
    pub fn apply_to<C: Canvas + ?Sized>(self, canvas: &mut C) {
        canvas.clear_edges();
        let materialized = canvas.set_nodes(self.nodes);
        log_edges(materialized, &self.pending_edges);
        canvas.set_edges(self.pending_edges);
    }
}

fn log_edges(materialized: NodesMaterialized, edges: &[Edge]) {
    debug!(
        nodes = materialized.node_count(),
        edges = edges.len(),
        "Applying edges after nodes materialized"
    );
}

/// Rebuilds canvas graphs from UI or execution configurations.
pub struct Importer {
    array_configs: Vec<ArrayConfig>,
    layout: LayoutOptions,
}

pub struct ImporterBuilder {
    array_configs: Vec<ArrayConfig>,
    layout: LayoutOptions,
}

impl ImporterBuilder {
    pub fn new() -> Self {
        Self {
            array_configs: Vec::new(),
            layout: LayoutOptions::default(),
        }
    }
    pub fn array_configs(mut self, configs: Vec<ArrayConfig>) -> Self {
        self.array_configs = configs;
        self
    }
    /// Takes the array group-by configuration from an execution config.
    pub fn execution(mut self, execution: &ExecutionMappingConfig) -> Self {
        self.array_configs = execution.arrays.clone();
        self
    }
    pub fn layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }
    pub fn build(self) -> Importer {
        Importer {
            array_configs: self.array_configs,
            layout: self.layout,
        }
    }
}

impl Default for ImporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Importer {
    fn default() -> Self {
        ImporterBuilder::new().build()
    }
}

impl Importer {
    pub fn builder() -> ImporterBuilder {
        ImporterBuilder::new()
    }

    /// Phase one: builds every node and the expansion hints, holding edges back.
    pub fn stage(&self, config: &MappingConfiguration) -> Result<StagedImport, ImportError> {
        let mut nodes = Vec::new();

        for source in &config.nodes.sources {
            nodes.push(Node::source(source.id.clone(), source.position, schema_data(source, None)));
        }
        for target in &config.nodes.targets {
            nodes.push(Node::target(
                target.id.clone(),
                target.position,
                schema_data(target, Some(&self.array_configs)),
            ));
        }
        for transform in &config.nodes.transforms {
            nodes.push(transform_node(transform)?);
        }
        for mapping in &config.nodes.mappings {
            nodes.push(Node::value_map(
                mapping.id.clone(),
                mapping.position,
                ValueMapData {
                    label: mapping.label.clone(),
                    table: mapping.table.clone(),
                    source_field: mapping.source_field.clone(),
                },
            ));
        }

        let mut seen = AHashSet::new();
        if let Some(duplicate) = nodes.iter().find(|n| !seen.insert(n.id.as_str())) {
            return Err(ImportError::DuplicateNode(duplicate.id.clone()));
        }

        let pending_edges: Vec<Edge> = config
            .connections
            .iter()
            .map(|c| Edge {
                id: c.id.clone(),
                source: c.source_node_id.clone(),
                source_handle: c.source_handle.clone(),
                target: c.target_node_id.clone(),
                target_handle: c.target_handle.clone(),
            })
            .collect();

        for edge in &pending_edges {
            for endpoint in [&edge.source, &edge.target] {
                if !seen.contains(endpoint.as_str()) {
                    warn!(edge = %edge.id, node = %endpoint, "Connection references a node missing from the configuration");
                }
            }
        }

        let plan = expansion::plan_expansions(&pending_edges);
        expansion::apply_expansions(&mut nodes, &plan);

        info!(
            config = %config.id,
            nodes = nodes.len(),
            edges = pending_edges.len(),
            "Staged configuration import"
        );
        Ok(StagedImport { nodes, pending_edges })
    }

    /// Imports headlessly, where nodes exist as soon as they are built.
    pub fn import(&self, config: &MappingConfiguration) -> Result<Graph, ImportError> {
        let mut graph = Graph::default();
        self.import_into(config, &mut graph)?;
        Ok(graph)
    }

    /// Imports into an interactive canvas in two phases.
    pub fn import_into<C: Canvas + ?Sized>(&self, config: &MappingConfiguration, canvas: &mut C) -> Result<(), ImportError> {
        self.stage(config)?.apply_to(canvas);
        Ok(())
    }

    /// Rebuilds a canvas from an execution configuration alone, with a column layout.
    ///
    /// All rule inputs share one source node and all outputs one target node;
    /// static, conditional and lookup rules get their own transform nodes.
    pub fn import_execution(&self, execution: &ExecutionMappingConfig) -> Graph {
        let from_fields: Vec<&str> = execution
            .mappings
            .iter()
            .filter_map(|m| m.from.as_deref())
            .unique()
            .collect();
        let to_fields: Vec<&str> = execution.mappings.iter().map(|m| m.to.as_str()).unique().collect();

        let source = SchemaNodeData::new("Source", string_fields(&from_fields));
        let target = SchemaNodeData::new("Target", reconstruct_fields(&string_fields(&to_fields), &self.array_configs));

        let mut builder = ExecutionGraphBuilder::default();
        builder.nodes.push(Node::source("source", self.layout.position(Column::Source, 0), source));
        builder.nodes.push(Node::target("target", self.layout.position(Column::Target, 0), target));

        for mapping in &execution.mappings {
            builder.add_rule(mapping, &self.layout);
        }

        info!(rules = execution.mappings.len(), nodes = builder.nodes.len(), "Rebuilt canvas from execution config");
        Graph::new(builder.nodes, builder.edges)
    }
}

fn string_fields(names: &[&str]) -> Vec<SchemaField> {
    names.iter().map(|name| SchemaField::new(*name, FieldType::String)).collect()
}

fn schema_data(config: &SchemaNodeConfig, array_configs: Option<&[ArrayConfig]>) -> SchemaNodeData {
    let fields = match array_configs {
        Some(array_configs) => reconstruct_fields(&config.schema.fields, array_configs),
        None => config.schema.fields.clone(),
    };
    SchemaNodeData {
        label: config.label.clone(),
        fields,
        sample_data: config.sample_data.clone(),
        expanded_fields: config.expanded_fields.clone(),
    }
}

/// Parameters go through the same normalization as canvas documents.
fn transform_node(config: &TransformNodeConfig) -> Result<Node, ImportError> {
    let kind = if NodeType::from_type_name(&config.type_name).is_some() {
        let payload = config_payload(&config.label, config.config.parameters.clone());
        migrate::node_kind(&config.id, &config.type_name, &payload)?
    } else {
        warn!(node = %config.id, type_name = %config.type_name, "Importing node of unrecognized type unchanged");
        NodeKind::Other {
            type_name: config.type_name.clone(),
            data: config.config.parameters.clone(),
        }
    };
    Ok(Node::new(config.id.clone(), config.position, kind))
}

#[derive(Default)]
struct ExecutionGraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    transform_rows: usize,
    node_ids: AHashMap<String, usize>,
}

impl ExecutionGraphBuilder {
    fn add_rule(&mut self, mapping: &ExecutionMapping, layout: &LayoutOptions) {
        let to = mapping.to.as_str();
        match &mapping.rule {
            MappingRule::Direct => {
                if let Some(from) = &mapping.from {
                    self.connect("source", Some(from), "target", Some(to));
                }
            }
            MappingRule::Static { value } => {
                let id = self.add_transform(
                    format!("static_{to}"),
                    TransformOp::Static(StaticParams {
                        values: vec![StaticEntry {
                            id: "value".to_string(),
                            value: value.clone(),
                        }],
                    }),
                    layout,
                );
                self.connect(&id, Some("value"), "target", Some(to));
            }
            MappingRule::IfThen {
                condition,
                then,
                otherwise,
            } => {
                let id = self.add_transform(
                    format!("conditional_{to}"),
                    TransformOp::Conditional(ConditionalParams {
                        operator: condition.operator,
                        compare_value: condition.value.clone(),
                        then_value: then.clone(),
                        else_value: otherwise.clone(),
                    }),
                    layout,
                );
                self.connect("source", mapping.from.as_deref(), &id, None);
                self.connect(&id, None, "target", Some(to));
            }
            MappingRule::Map { map, transform } => {
                let table_id = format!("table_{to}");
                let row = self.next_row();
                self.push_node(Node::value_map(
                    table_id.clone(),
                    layout.position(Column::Transform, row),
                    ValueMapData {
                        label: format!("Lookup {to}"),
                        table: map.clone(),
                        source_field: mapping.from.clone(),
                    },
                ));
                match transform.as_ref().map(transform_op) {
                    Some(op) => {
                        let id = self.add_transform(format!("transform_{to}"), op, layout);
                        self.connect("source", mapping.from.as_deref(), &id, None);
                        self.connect(&id, None, &table_id, None);
                    }
                    None => self.connect("source", mapping.from.as_deref(), &table_id, None),
                }
                self.connect(&table_id, None, "target", Some(to));
            }
            MappingRule::Skip => debug!(to, "Skip rule has no canvas representation"),
        }
    }

    fn next_row(&mut self) -> usize {
        let row = self.transform_rows;
        self.transform_rows += 1;
        row
    }

    fn push_node(&mut self, node: Node) {
        if self.node_ids.contains_key(&node.id) {
            return;
        }
        self.node_ids.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    fn add_transform(&mut self, id: String, op: TransformOp, layout: &LayoutOptions) -> String {
        let row = self.next_row();
        let label = id.clone();
        self.push_node(Node::transform(id.clone(), layout.position(Column::Transform, row), label, op));
        id
    }

    fn connect(&mut self, source: &str, source_handle: Option<&str>, target: &str, target_handle: Option<&str>) {
        let mut edge = Edge::new(format!("edge-{}", self.edges.len() + 1), source, target);
        edge.source_handle = source_handle.map(str::to_string);
        edge.target_handle = target_handle.map(str::to_string);
        self.edges.push(edge);
    }
}

fn transform_op(transform: &FieldTransform) -> TransformOp {
    match transform {
        FieldTransform::Split { delimiter, index } => TransformOp::Split(SplitParams {
            delimiter: delimiter.clone(),
            index: *index,
        }),
        FieldTransform::Substring { start, end } => TransformOp::StringOperation(StringOperationParams {
            string_operation: StringOperation::Substring,
            start: Some(*start),
            end: *end,
        }),
        FieldTransform::Uppercase => string_op(StringOperation::Uppercase),
        FieldTransform::Lowercase => string_op(StringOperation::Lowercase),
        FieldTransform::Trim => string_op(StringOperation::Trim),
    }
}

fn string_op(string_operation: StringOperation) -> TransformOp {
    TransformOp::StringOperation(StringOperationParams {
        string_operation,
        ..Default::default()
    })
}
