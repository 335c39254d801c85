use thiserror::Error;

/// A soft failure met while compiling a graph.
///
/// The offending edge, node or connection is left out of the output and the
/// rest of the graph is still compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionWarning {
    #[error("Edge '{edge_id}' references unknown node '{node_id}'")]
    UnknownNode { edge_id: String, node_id: String },

    #[error("Node '{node_id}' has no field for handle '{handle}'")]
    UnknownField { node_id: String, handle: String },

    #[error("Edge '{edge_id}' leaves field node '{node_id}' without a source handle")]
    MissingHandle { edge_id: String, node_id: String },

    #[error("Node '{node_id}' has no input connection")]
    MissingInput { node_id: String },

    #[error("Static node '{node_id}' has no value for handle '{handle}'")]
    MissingStaticEntry { node_id: String, handle: String },

    #[error("Edge '{edge_id}' originates at '{node_id}' of type '{type_name}', which produces no mapping")]
    UnsupportedOrigin {
        edge_id: String,
        node_id: String,
        type_name: String,
    },

    #[error("Resolving node '{node_id}' exceeded the depth limit of {limit}; the graph may contain a cycle")]
    DepthExceeded { node_id: String, limit: usize },

    #[error("Node '{node_id}' has unrecognized type '{type_name}' and was exported as a transform")]
    UnknownNodeType { node_id: String, type_name: String },

    #[error("Nodes {node_ids:?} form a cycle and were left out of the execution plan")]
    Cycle { node_ids: Vec<String> },
}
