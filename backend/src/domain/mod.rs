// Domain layer module
pub mod aggregates;
pub mod base;
pub mod similarity_index;
pub mod value_objects;

pub use aggregates::*;
pub use base::*;
pub use similarity_index::*;
pub use value_objects::*;
