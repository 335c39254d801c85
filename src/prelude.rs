//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the fieldmap crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use fieldmap::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let config = MappingConfiguration::from_json(&std::fs::read_to_string("path/to/ui.json")?)?;
//! let graph = Importer::default().import(&config)?;
//!
//! let (execution, warnings) = Exporter::builder().build().export_execution(&graph);
//! println!("{} rules, {} warnings", execution.mappings.len(), warnings.len());
//! # Ok(())
//! # }
//! ```

// Graph and export/import
pub use crate::compiler::{ExportOptions, ExportOutput, Exporter, ResolutionWarning};
pub use crate::graph::{Edge, Graph, LayoutOptions, Node, NodeKind, NodeType, Position};
pub use crate::importer::{Canvas, Importer, NodesMaterialized, StagedImport};

// Documents
pub use crate::config::MappingConfiguration;
pub use crate::rules::{ExecutionMapping, ExecutionMappingConfig, MappingArtifact, MappingRule, TransformOp};
pub use crate::schema::{ArrayConfig, FieldType, SchemaField};

// Suggestions and storage
pub use crate::store::{MappingRepository, MappingStore, MemoryRepository, SaveRequest, SavedMapping};
pub use crate::suggest::{IntoCanvas, MappingSuggestion, SuggestionSet, convert_mappings_to_canvas};

// Error types
pub use crate::error::{ArtifactError, ImportError, StoreError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
