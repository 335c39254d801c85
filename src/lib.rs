//! # fieldmap - Mapping Configuration Compiler
//!
//! **fieldmap** compiles the node graph of a visual source-to-target mapping
//! canvas into a flat, engine-consumable list of field rules, and rebuilds the
//! canvas from saved configurations. Source and target schemas are nodes;
//! concat, split, conditional, lookup-table, date and coalesce transforms sit
//! between them; edges connect field handles.
//!
//! ## Core Workflow
//!
//! 1.  **Load a Canvas**: Parse a canvas document (`{nodes, edges}`) into a [`graph::Graph`].
//!     Historical node data layouts are normalized once, at this boundary.
//! 2.  **Export**: Use [`compiler::Exporter::builder`] to produce both a UI snapshot
//!     ([`config::MappingConfiguration`]) and an execution configuration
//!     ([`rules::ExecutionMappingConfig`]). Gaps in the graph become warnings, never errors.
//! 3.  **Persist**: Save versions through a [`store::MappingStore`], which keeps exactly
//!     one active version per mapping group.
//! 4.  **Import**: Rebuild the canvas with [`importer::Importer`], either headlessly or in
//!     two phases against an interactive [`importer::Canvas`].
//!
//! A canvas can also be bootstrapped from AI-proposed mappings with the [`suggest`] module.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fieldmap::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let canvas_json = std::fs::read_to_string("path/to/canvas.json")?;
//!     let graph = Graph::from_json(&canvas_json)?;
//!
//!     let exporter = Exporter::builder().name("Customers").version("1.0").build();
//!     let output = exporter.export(&graph);
//!     for warning in &output.warnings {
//!         println!("-> Skipped: {}", warning);
//!     }
//!     println!("{}", output.execution.to_json()?);
//!
//!     // Rebuild the canvas from the UI snapshot.
//!     let rebuilt = Importer::builder()
//!         .execution(&output.execution)
//!         .build()
//!         .import(&output.ui)?;
//!     assert_eq!(rebuilt.nodes().len(), graph.nodes().len());
//!     Ok(())
//! }
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod importer;
pub mod prelude;
pub mod rules;
pub mod schema;
pub mod settings;
pub mod store;
pub mod suggest;
