pub mod field;
pub mod reconstruct;

pub use field::*;
pub use reconstruct::*;
