//! Physical column layout and mapping rules.
//!
//! Every logical property expands into one column per admitted value kind,
//! plus a discriminator column for union types. Column ordinals are assigned
//! from a single counter per [`EntityMapper`].

mod generator;
mod mapper;
mod rules;

pub use generator::MappingGenerator;
pub use mapper::{create_entity_map, ColumnMapper, EntityMapper, PropertyMapper};
pub use rules::{create_mapping_rules, ColumnMappingRule, ColumnSource, PropertyMappingRule};
