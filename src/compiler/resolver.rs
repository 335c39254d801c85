use super::diagnostics::ResolutionWarning;
use crate::graph::{Edge, Graph, Node, NodeKind, SchemaNodeData, ValueMapData};
use crate::rules::{Condition, ExecutionMapping, FieldTransform, TransformOp};
use crate::schema::find_field;

/// Walks edges backwards from a target field to the node that produces its value.
pub(super) struct Resolver<'a> {
    graph: &'a Graph,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub(super) fn new(graph: &'a Graph, max_depth: usize) -> Self {
        Self { graph, max_depth }
    }

    /// Resolves one incoming edge of a target field into an execution rule.
    pub(super) fn resolve(&self, edge: &Edge, to: &str) -> Result<ExecutionMapping, ResolutionWarning> {
        let origin = self.find_node(edge, &edge.source)?;

        match &origin.kind {
            NodeKind::Source(data) => {
                let from = self.field_name(edge, origin, data)?;
                Ok(ExecutionMapping::direct(from, to))
            }
            NodeKind::Transform {
                op: TransformOp::Static(params),
                ..
            } => {
                let entry = params
                    .entry(edge.source_handle())
                    .ok_or_else(|| ResolutionWarning::MissingStaticEntry {
                        node_id: origin.id.clone(),
                        handle: edge.source_handle().unwrap_or_default().to_string(),
                    })?;
                Ok(ExecutionMapping::fixed(to, entry.value.clone()))
            }
            NodeKind::Transform {
                op: TransformOp::Conditional(params),
                ..
            } => {
                let from = self.input_field(&origin.id, 1)?;
                let condition = Condition {
                    operator: params.operator,
                    value: params.compare_value.clone(),
                };
                Ok(ExecutionMapping::if_then(
                    from,
                    to,
                    condition,
                    params.then_value.clone(),
                    params.else_value.clone(),
                ))
            }
            NodeKind::ValueMap(data) => self.resolve_lookup(origin, data, to),
            NodeKind::Target(_) | NodeKind::Transform { .. } | NodeKind::Other { .. } => {
                Err(ResolutionWarning::UnsupportedOrigin {
                    edge_id: edge.id.clone(),
                    node_id: origin.id.clone(),
                    type_name: origin.type_name().to_string(),
                })
            }
        }
    }

    /// A lookup node reads either a source field directly or a field passed
    /// through one string or split transform, whose parameters are captured.
    fn resolve_lookup(
        &self,
        node: &Node,
        data: &ValueMapData,
        to: &str,
    ) -> Result<ExecutionMapping, ResolutionWarning> {
        let Some(input) = self.graph.first_input(&node.id) else {
            // An unconnected lookup node still remembers the field it was built from.
            return data
                .source_field
                .as_ref()
                .map(|from| ExecutionMapping::lookup(from.clone(), to, data.table.clone(), None))
                .ok_or_else(|| ResolutionWarning::MissingInput {
                    node_id: node.id.clone(),
                });
        };

        let upstream = self.find_node(input, &input.source)?;
        let (from, transform) = match &upstream.kind {
            NodeKind::Source(source) => (self.field_name(input, upstream, source)?, None),
            NodeKind::Transform {
                op: TransformOp::StringOperation(params),
                ..
            } => (
                self.input_field(&upstream.id, 2)?,
                FieldTransform::from_string_operation(params),
            ),
            NodeKind::Transform {
                op: TransformOp::Split(params),
                ..
            } => (
                self.input_field(&upstream.id, 2)?,
                Some(FieldTransform::from_split(params)),
            ),
            _ => {
                return Err(ResolutionWarning::UnsupportedOrigin {
                    edge_id: input.id.clone(),
                    node_id: upstream.id.clone(),
                    type_name: upstream.type_name().to_string(),
                });
            }
        };

        Ok(ExecutionMapping::lookup(from, to, data.table.clone(), transform))
    }

    /// Follows a node's single input upstream until it reaches a source field.
    fn input_field(&self, node_id: &str, depth: usize) -> Result<String, ResolutionWarning> {
        if depth > self.max_depth {
            return Err(ResolutionWarning::DepthExceeded {
                node_id: node_id.to_string(),
                limit: self.max_depth,
            });
        }

        let input = self
            .graph
            .first_input(node_id)
            .ok_or_else(|| ResolutionWarning::MissingInput {
                node_id: node_id.to_string(),
            })?;
        let upstream = self.find_node(input, &input.source)?;

        match &upstream.kind {
            NodeKind::Source(data) => self.field_name(input, upstream, data),
            NodeKind::Target(_) => Err(ResolutionWarning::UnsupportedOrigin {
                edge_id: input.id.clone(),
                node_id: upstream.id.clone(),
                type_name: upstream.type_name().to_string(),
            }),
            NodeKind::ValueMap(_) | NodeKind::Transform { .. } | NodeKind::Other { .. } => {
                self.input_field(&upstream.id, depth + 1)
            }
        }
    }

    fn field_name(&self, edge: &Edge, node: &Node, data: &SchemaNodeData) -> Result<String, ResolutionWarning> {
        let handle = edge
            .source_handle()
            .ok_or_else(|| ResolutionWarning::MissingHandle {
                edge_id: edge.id.clone(),
                node_id: node.id.clone(),
            })?;
        find_field(&data.fields, handle)
            .map(|field| field.name.clone())
            .ok_or_else(|| ResolutionWarning::UnknownField {
                node_id: node.id.clone(),
                handle: handle.to_string(),
            })
    }

    fn find_node(&self, edge: &Edge, node_id: &str) -> Result<&'a Node, ResolutionWarning> {
        self.graph
            .node(node_id)
            .ok_or_else(|| ResolutionWarning::UnknownNode {
                edge_id: edge.id.clone(),
                node_id: node_id.to_string(),
            })
    }
}
