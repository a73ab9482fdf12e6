//! Index schema derivation from model metadata.

mod builder;
mod equivalence;
mod field_type;

pub use builder::{build_schema, build_schemas, model_properties};
pub use equivalence::mappings_equivalent;
pub use field_type::map_field_type;
