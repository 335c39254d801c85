use super::diagnostics::ResolutionWarning;
use crate::config::ExecutionStep;
use crate::graph::{Graph, NodeKind};
use ahash::AHashMap;
use itertools::Itertools;
use std::collections::VecDeque;

/// Orders transform and lookup nodes so every node follows the nodes feeding it.
///
/// Ties keep graph order. Nodes on a cycle never reach in-degree zero; they are
/// reported once and left out of the plan.
pub(super) fn execution_steps(graph: &Graph, warnings: &mut Vec<ResolutionWarning>) -> Vec<ExecutionStep> {
    let step_nodes: Vec<&str> = graph
        .nodes_where(|kind| kind.is_transform() || matches!(kind, NodeKind::ValueMap(_)))
        .map(|n| n.id.as_str())
        .collect();

    let mut in_degree: AHashMap<&str, usize> = step_nodes.iter().map(|&id| (id, 0)).collect();
    let mut dependents: AHashMap<&str, Vec<&str>> = AHashMap::new();

    for edge in graph.edges() {
        if !(in_degree.contains_key(edge.source.as_str()) && in_degree.contains_key(edge.target.as_str())) {
            continue;
        }
        dependents.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
        if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
            *degree += 1;
        }
    }

    let mut ready: VecDeque<&str> = step_nodes.iter().copied().filter(|id| in_degree[id] == 0).collect();
    let mut steps = Vec::with_capacity(step_nodes.len());

    while let Some(node_id) = ready.pop_front() {
        let Some(node) = graph.node(node_id) else {
            continue;
        };
        steps.push(ExecutionStep {
            node_id: node.id.clone(),
            type_name: node.type_name().to_string(),
            inputs: graph
                .incoming(node_id)
                .map(|edge| edge.source.clone())
                .unique()
                .collect(),
        });

        for &next in dependents.get(node_id).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(next);
                }
            }
        }
    }

    if steps.len() < step_nodes.len() {
        let node_ids: Vec<String> = step_nodes
            .iter()
            .filter(|&&id| in_degree[id] > 0)
            .map(|id| id.to_string())
            .collect();
        tracing::warn!(?node_ids, "Execution plan skipped nodes on a cycle");
        warnings.push(ResolutionWarning::Cycle { node_ids });
    }

    steps
}
