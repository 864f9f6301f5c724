//! Runtime values held by physical columns.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::Entity;
use super::union_type::{discriminator_literal, type_code_literal, UnionTag};

/// Value stored in a single physical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// No value.
    Undefined,
    /// Discriminator byte.
    Tag(u8),
    /// Boolean value.
    Boolean(bool),
    /// Decimal value.
    Numeric(f64),
    /// Date and time value.
    DateTime(NaiveDateTime),
    /// String value.
    String(String),
    /// Byte array value.
    Binary(Vec<u8>),
    /// UUID value.
    Uuid(Uuid),
    /// Referenced type code.
    TypeCode(i32),
    /// Reference value.
    Entity(Entity),
    /// Row version counter.
    Version(u64),
    /// 64-bit signed integer.
    Integer(i64),
}

impl Value {
    /// Returns true for [`Value::Undefined`].
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns the logical kind of this value, if it has one.
    #[must_use]
    pub fn tag(&self) -> Option<UnionTag> {
        match self {
            Value::Undefined | Value::TypeCode(_) => None,
            Value::Tag(_) => Some(UnionTag::Tag),
            Value::Boolean(_) => Some(UnionTag::Boolean),
            Value::Numeric(_) => Some(UnionTag::Numeric),
            Value::DateTime(_) => Some(UnionTag::DateTime),
            Value::String(_) => Some(UnionTag::String),
            Value::Binary(_) => Some(UnionTag::Binary),
            Value::Uuid(_) => Some(UnionTag::Uuid),
            Value::Entity(_) => Some(UnionTag::Entity),
            Value::Version(_) => Some(UnionTag::Version),
            Value::Integer(_) => Some(UnionTag::Integer),
        }
    }

    /// Renders the value as a SQL literal.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Value::Undefined => "NULL".to_string(),
            Value::Tag(tag) => discriminator_literal(*tag),
            Value::Boolean(b) => if *b { "0x01" } else { "0x00" }.to_string(),
            Value::Numeric(n) => n.to_string(),
            Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::String(s) => format!("N'{}'", s.replace('\'', "''")),
            Value::Binary(bytes) => hex_literal(bytes),
            Value::Uuid(uuid) => hex_literal(uuid.as_bytes()),
            Value::TypeCode(code) => type_code_literal(*code),
            Value::Entity(entity) => hex_literal(entity.identity.as_bytes()),
            Value::Version(v) => hex_literal(&v.to_be_bytes()),
            Value::Integer(i) => i.to_string(),
        }
    }
}

fn hex_literal(bytes: &[u8]) -> String {
    let mut literal = String::with_capacity(2 + bytes.len() * 2);
    literal.push_str("0x");
    for byte in bytes {
        literal.push_str(&format!("{byte:02X}"));
    }
    literal
}
