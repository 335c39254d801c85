//! Bootstrapping a canvas from AI-proposed field mappings.

pub mod canvas;
pub mod oracle;
pub mod suggestion;

pub use canvas::*;
pub use oracle::*;
pub use suggestion::*;
