use thiserror::Error;

/// Errors raised when a schema field tree breaks its shape invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Field '{field_id}' of type '{field_type}' must not declare children")]
    UnexpectedChildren { field_id: String, field_type: String },

    #[error("Field '{field_id}' of type '{field_type}' requires a children list")]
    MissingChildren { field_id: String, field_type: String },

    #[error("Field '{field_id}' declares groupBy but is not an array")]
    GroupByOnNonArray { field_id: String },

    #[error("Field '{field_id}' groups by '{group_by}', which is not one of its children")]
    UnknownGroupBy { field_id: String, group_by: String },
}

/// An execution rule that breaks the `from`/`type` invariant.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("mapping to '{to}' is invalid: {reason}")]
pub struct InvalidMapping {
    pub to: String,
    pub reason: &'static str,
}

/// Errors raised while normalizing a node's `data` payload into its canonical shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeShapeError {
    #[error("Node '{node_id}' of type '{type_name}' has invalid data: {message}")]
    InvalidData {
        node_id: String,
        type_name: String,
        message: String,
    },

    #[error("Node '{node_id}' has a non-object data payload")]
    NotAnObject { node_id: String },
}

/// Errors that abort an import before any node reaches the canvas.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error(transparent)]
    NodeShape(#[from] NodeShapeError),

    #[error("Node id '{0}' appears more than once in the configuration")]
    DuplicateNode(String),
}

/// Errors reading or writing serialized mapping artifacts.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Could not access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary encoding failed: {0}")]
    Encode(String),

    #[error("Binary decoding failed: {0}")]
    Decode(String),

    #[error("Unsupported artifact format version {found} (expected {expected})")]
    FormatVersion { found: u16, expected: u16 },
}

/// Errors from a single AI suggestion request. Each one is fatal for that request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Suggestion oracle call failed: {0}")]
    Transport(String),

    #[error("Oracle response does not contain a JSON array")]
    MissingArray,

    #[error("Oracle response contains malformed JSON: {0}")]
    MalformedJson(String),

    #[error("No sample records were provided for the {0} side")]
    EmptySamples(&'static str),
}

/// Failures reported by the persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("record '{0}' not found")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Errors from the versioning and activation store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("No authenticated user")]
    Unauthenticated,

    #[error("A mapping named '{name}' already exists")]
    NameConflict { name: String },

    #[error("Mapping '{0}' not found")]
    NotFound(String),

    #[error("Invalid mapping request: {0}")]
    Validation(String),

    #[error("{stage}: {source}")]
    Persistence {
        stage: &'static str,
        #[source]
        source: PersistenceError,
    },
}

impl StoreError {
    /// Wraps a collaborator failure with the stage that was running when it happened.
    pub fn at(stage: &'static str) -> impl FnOnce(PersistenceError) -> StoreError {
        move |source| StoreError::Persistence { stage, source }
    }
}

/// Errors loading a settings file.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not read settings file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse settings file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
