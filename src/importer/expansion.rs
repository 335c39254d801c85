use crate::graph::{Edge, Node, NodeKind};
use crate::schema::strip_array_indices;
use ahash::AHashMap;
use std::collections::BTreeSet;
use tracing::debug;

/// Ancestor paths of a field handle that must be expanded for the handle to be visible.
///
/// Every proper prefix of the dot path is returned with array indices removed:
/// `items[2].address.city` yields `items` and `items.address`.
pub fn expansion_paths(handle: &str) -> Vec<String> {
    let segments: Vec<&str> = handle.split('.').collect();
    (1..segments.len())
        .map(|len| strip_array_indices(&segments[..len].join(".")))
        .filter(|path| !path.is_empty())
        .collect()
}

/// Expansion hints per source node, computed from a set of edges.
pub(super) fn plan_expansions(edges: &[Edge]) -> AHashMap<String, BTreeSet<String>> {
    let mut plan: AHashMap<String, BTreeSet<String>> = AHashMap::new();
    for edge in edges {
        let Some(handle) = edge.source_handle() else {
            debug!(edge = %edge.id, "Edge has no source handle; nothing to expand");
            continue;
        };
        let paths = expansion_paths(handle);
        if !paths.is_empty() {
            plan.entry(edge.source.clone()).or_default().extend(paths);
        }
    }
    plan
}

/// Attaches expansion hints to the source nodes they belong to.
pub(super) fn apply_expansions(nodes: &mut [Node], plan: &AHashMap<String, BTreeSet<String>>) {
    for node in nodes {
        let Some(paths) = plan.get(&node.id) else {
            continue;
        };
        if let NodeKind::Source(data) = &mut node.kind {
            data.expanded_fields.extend(paths.iter().cloned());
        }
    }
}
