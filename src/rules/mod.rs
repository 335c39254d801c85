pub mod artifact;
pub mod execution;
pub mod transform;

pub use artifact::*;
pub use execution::*;
pub use transform::*;
