//! Value type model: union types, references and column values.

mod entity;
mod union_type;
mod value;

pub use entity::Entity;
pub use union_type::{
    discriminator_literal, type_code_literal, ColumnPurpose, UnionFlags, UnionTag, UnionType,
    DISCRIMINATOR_ENTITY, DISCRIMINATOR_UNDEFINED, TYPE_CODE_ANY, TYPE_CODE_UNASSIGNED,
};
pub use value::Value;
