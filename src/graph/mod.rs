use ahash::AHashMap;
use serde::{Deserialize, Serialize};

pub mod edge;
pub mod layout;
pub mod migrate;
pub mod node;

pub use edge::*;
pub use layout::*;
pub use node::*;

/// The canvas graph: nodes, edges, and the lookup indices derived from them.
///
/// The indices are maintained by every mutating method, so operations that walk
/// the graph never rebuild them ad hoc.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "CanvasDocument", into = "CanvasDocument")]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: AHashMap<String, usize>,
    /// target node id -> indices into `edges`, in edge order.
    incoming: AHashMap<String, Vec<usize>>,
}

/// Serialized form of a [`Graph`]: `{nodes, edges}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl From<CanvasDocument> for Graph {
    fn from(doc: CanvasDocument) -> Self {
        Graph::new(doc.nodes, doc.edges)
    }
}

impl From<Graph> for CanvasDocument {
    fn from(graph: Graph) -> Self {
        let (nodes, edges) = graph.into_parts();
        CanvasDocument { nodes, edges }
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut graph = Graph::default();
        graph.set_nodes(nodes);
        graph.set_edges(edges);
        graph
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let index = *self.node_index.get(id)?;
        Some(&mut self.nodes[index])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Edges arriving at a node, in edge order.
    pub fn incoming(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.incoming
            .get(node_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    /// Edges arriving at one handle of a node, in edge order.
    pub fn incoming_at<'a>(&'a self, node_id: &'a str, handle: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.incoming(node_id)
            .filter(move |edge| edge.target_handle() == Some(handle))
    }

    /// The single input of a transform or lookup node: its first incoming edge.
    pub fn first_input(&self, node_id: &str) -> Option<&Edge> {
        self.incoming(node_id).next()
    }

    /// Adds a node, replacing any node with the same id in place.
    pub fn push_node(&mut self, node: Node) {
        match self.node_index.get(&node.id) {
            Some(&i) => self.nodes[i] = node,
            None => {
                self.node_index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    pub fn push_edge(&mut self, edge: Edge) {
        self.incoming
            .entry(edge.target.clone())
            .or_default()
            .push(self.edges.len());
        self.edges.push(edge);
    }

    /// Replaces every node. Edges are left untouched.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes.clear();
        self.node_index.clear();
        for node in nodes {
            self.push_node(node);
        }
    }

    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.clear_edges();
        for edge in edges {
            self.push_edge(edge);
        }
    }

    pub fn clear_edges(&mut self) {
        self.edges.clear();
        self.incoming.clear();
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes, self.edges)
    }

    /// Nodes of a given kind, in graph order.
    pub fn nodes_where(&self, predicate: impl Fn(&NodeKind) -> bool) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| predicate(&n.kind))
    }
}
