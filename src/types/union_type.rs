//! Composite ("union") value types and their physical column encoding.
//!
//! A logical value may admit several primitive kinds at once. Each admitted
//! kind is stored in its own physical column, optionally preceded by a
//! one-byte discriminator column recording which kind the value currently
//! holds. [`ColumnPurpose`] is the single table mapping every kind to its
//! column postfix, database type and default value.

use std::fmt;

use bitflags::bitflags;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::Entity;
use super::value::Value;

/// Discriminator byte for a value with no kind.
pub const DISCRIMINATOR_UNDEFINED: u8 = 0x01;

/// Discriminator byte for a reference value.
pub const DISCRIMINATOR_ENTITY: u8 = 0x08;

/// Type code of a type that never carried a reference.
pub const TYPE_CODE_UNASSIGNED: i32 = -1;

/// Type code of a reference that may point to any object type.
pub const TYPE_CODE_ANY: i32 = 0;

bitflags! {
    /// Kinds admitted by a [`UnionType`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UnionFlags: u16 {
        /// Physical discriminator present.
        const TAG = 1 << 0;
        const BOOLEAN = 1 << 1;
        const NUMERIC = 1 << 2;
        const DATETIME = 1 << 3;
        const STRING = 1 << 4;
        const BINARY = 1 << 5;
        const UUID = 1 << 6;
        const ENTITY = 1 << 7;
        const VERSION = 1 << 8;
        const INTEGER = 1 << 9;
    }
}

impl UnionFlags {
    /// Every value kind, the discriminator excluded.
    pub const VALUES: UnionFlags = UnionFlags::TAG.complement();
}

/// A single kind of a [`UnionType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnionTag {
    Tag,
    Boolean,
    Numeric,
    DateTime,
    String,
    Binary,
    Uuid,
    Entity,
    Version,
    Integer,
}

impl UnionTag {
    /// All tags in expansion order.
    pub const ALL: [UnionTag; 10] = [
        UnionTag::Tag,
        UnionTag::Boolean,
        UnionTag::Numeric,
        UnionTag::DateTime,
        UnionTag::String,
        UnionTag::Binary,
        UnionTag::Uuid,
        UnionTag::Entity,
        UnionTag::Version,
        UnionTag::Integer,
    ];

    /// Returns the flag for this tag.
    #[must_use]
    pub fn flag(self) -> UnionFlags {
        match self {
            UnionTag::Tag => UnionFlags::TAG,
            UnionTag::Boolean => UnionFlags::BOOLEAN,
            UnionTag::Numeric => UnionFlags::NUMERIC,
            UnionTag::DateTime => UnionFlags::DATETIME,
            UnionTag::String => UnionFlags::STRING,
            UnionTag::Binary => UnionFlags::BINARY,
            UnionTag::Uuid => UnionFlags::UUID,
            UnionTag::Entity => UnionFlags::ENTITY,
            UnionTag::Version => UnionFlags::VERSION,
            UnionTag::Integer => UnionFlags::INTEGER,
        }
    }

    /// Returns the discriminator byte stored in a `_TYPE` column for this kind,
    /// or `None` if the kind has no discriminator of its own.
    #[must_use]
    pub fn discriminator(self) -> Option<u8> {
        match self {
            UnionTag::Boolean => Some(0x02),
            UnionTag::Numeric => Some(0x03),
            UnionTag::DateTime => Some(0x04),
            UnionTag::String => Some(0x05),
            UnionTag::Entity => Some(DISCRIMINATOR_ENTITY),
            UnionTag::Tag
            | UnionTag::Binary
            | UnionTag::Uuid
            | UnionTag::Version
            | UnionTag::Integer => None,
        }
    }

    /// Returns the name of the tag.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            UnionTag::Tag => "Tag",
            UnionTag::Boolean => "Boolean",
            UnionTag::Numeric => "Numeric",
            UnionTag::DateTime => "DateTime",
            UnionTag::String => "String",
            UnionTag::Binary => "Binary",
            UnionTag::Uuid => "Uuid",
            UnionTag::Entity => "Entity",
            UnionTag::Version => "Version",
            UnionTag::Integer => "Integer",
        }
    }

    /// Maps a primitive type token of the scripting language to its tag.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<UnionTag> {
        match name.to_ascii_lowercase().as_str() {
            "boolean" => Some(UnionTag::Boolean),
            "number" | "decimal" | "numeric" => Some(UnionTag::Numeric),
            "datetime" => Some(UnionTag::DateTime),
            "string" => Some(UnionTag::String),
            "binary" => Some(UnionTag::Binary),
            "uuid" => Some(UnionTag::Uuid),
            "entity" => Some(UnionTag::Entity),
            "version" => Some(UnionTag::Version),
            "integer" => Some(UnionTag::Integer),
            _ => None,
        }
    }
}

impl fmt::Display for UnionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical type of a value: a set of admitted kinds plus, for references,
/// the referenced type code.
///
/// The type code is `-1` until a reference is merged in, `0` when the value
/// may reference any type, and positive when it references exactly one type.
/// Merging never removes a kind, and once two different reference types have
/// been merged the type code stays `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnionType {
    flags: UnionFlags,
    type_code: i32,
}

impl Default for UnionType {
    fn default() -> Self {
        UnionType::undefined()
    }
}

impl From<UnionTag> for UnionType {
    fn from(tag: UnionTag) -> Self {
        UnionType::from_tag(tag)
    }
}

impl UnionType {
    /// Creates a type admitting no kind (the type of `NULL`).
    #[must_use]
    pub const fn undefined() -> Self {
        UnionType {
            flags: UnionFlags::empty(),
            type_code: TYPE_CODE_UNASSIGNED,
        }
    }

    /// Creates a type admitting a single kind.
    ///
    /// A bare `Entity` tag references any type.
    #[must_use]
    pub fn from_tag(tag: UnionTag) -> Self {
        let type_code = if tag == UnionTag::Entity {
            TYPE_CODE_ANY
        } else {
            TYPE_CODE_UNASSIGNED
        };
        UnionType {
            flags: tag.flag(),
            type_code,
        }
    }

    /// Creates a reference type for the given type code.
    #[must_use]
    pub fn entity(type_code: i32) -> Self {
        UnionType {
            flags: UnionFlags::ENTITY,
            type_code: type_code.max(TYPE_CODE_ANY),
        }
    }

    /// Creates a type from raw flags; `ENTITY` without a code references any type.
    #[must_use]
    pub fn from_flags(flags: UnionFlags) -> Self {
        let type_code = if flags.contains(UnionFlags::ENTITY) {
            TYPE_CODE_ANY
        } else {
            TYPE_CODE_UNASSIGNED
        };
        UnionType { flags, type_code }
    }

    /// Builds a type from a list of tags.
    #[must_use]
    pub fn of(tags: &[UnionTag]) -> Self {
        tags.iter()
            .fold(UnionType::undefined(), |acc, tag| acc.merged(&UnionType::from_tag(*tag)))
    }

    /// Returns the admitted kinds.
    #[must_use]
    pub fn flags(&self) -> UnionFlags {
        self.flags
    }

    /// Returns the reference type code.
    #[must_use]
    pub fn type_code(&self) -> i32 {
        self.type_code
    }

    /// Returns true if the kind is admitted.
    #[must_use]
    pub fn has(&self, tag: UnionTag) -> bool {
        self.flags.contains(tag.flag())
    }

    /// Adds a kind to this type.
    pub fn add(&mut self, tag: UnionTag) {
        self.merge(&UnionType::from_tag(tag));
    }

    /// Returns a copy with the discriminator flag set.
    #[must_use]
    pub fn with_tag(mut self) -> Self {
        self.flags |= UnionFlags::TAG;
        self
    }

    /// Merges another type into this one.
    pub fn merge(&mut self, other: &UnionType) {
        self.flags |= other.flags;
        self.type_code = merge_type_codes(self.type_code, other.type_code);
    }

    /// Returns the merge of two types.
    #[must_use]
    pub fn merged(mut self, other: &UnionType) -> Self {
        self.merge(other);
        self
    }

    /// Returns true if no kind is admitted.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.flags.is_empty()
    }

    /// Returns true if more than one value kind is admitted, or the value may
    /// reference more than one type.
    #[must_use]
    pub fn is_union(&self) -> bool {
        let values = (self.flags & UnionFlags::VALUES).bits().count_ones();
        values > 1 || (self.has(UnionTag::Entity) && self.type_code == TYPE_CODE_ANY)
    }

    /// Returns the only value kind of a non-union type.
    #[must_use]
    pub fn single_tag(&self) -> Option<UnionTag> {
        if self.is_union() {
            return None;
        }
        UnionTag::ALL
            .into_iter()
            .filter(|tag| *tag != UnionTag::Tag)
            .find(|tag| self.has(*tag))
    }

    /// Returns the referenced type code when this type is exactly one
    /// concrete reference type.
    #[must_use]
    pub fn single_reference(&self) -> Option<i32> {
        match self.single_tag() {
            Some(UnionTag::Entity) if self.type_code > TYPE_CODE_ANY => Some(self.type_code),
            _ => None,
        }
    }

    /// Returns true if a physical discriminator column is part of the encoding.
    #[must_use]
    pub fn needs_discriminator(&self) -> bool {
        self.is_union() || self.has(UnionTag::Tag)
    }

    /// Expands this type into its physical column purposes, in storage order.
    #[must_use]
    pub fn column_purposes(&self) -> Vec<ColumnPurpose> {
        let union = self.is_union();
        let mut purposes = Vec::new();
        if self.needs_discriminator() {
            purposes.push(ColumnPurpose::Tag);
        }
        for tag in UnionTag::ALL {
            if tag == UnionTag::Tag || !self.has(tag) {
                continue;
            }
            if tag == UnionTag::Entity && union {
                purposes.push(ColumnPurpose::TypeCode);
            }
            purposes.push(ColumnPurpose::from(tag));
        }
        purposes
    }
}

/// Merges reference type codes: unassigned is neutral, two different codes
/// collapse to "any type" for good.
fn merge_type_codes(left: i32, right: i32) -> i32 {
    match (left, right) {
        (TYPE_CODE_UNASSIGNED, code) | (code, TYPE_CODE_UNASSIGNED) => code,
        (a, b) if a == b => a,
        _ => TYPE_CODE_ANY,
    }
}

impl fmt::Display for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            return f.write_str("Undefined");
        }
        let mut first = true;
        for tag in UnionTag::ALL {
            if !self.has(tag) {
                continue;
            }
            if !first {
                f.write_str("|")?;
            }
            first = false;
            if tag == UnionTag::Entity {
                write!(f, "Entity({})", self.type_code)?;
            } else {
                f.write_str(tag.name())?;
            }
        }
        Ok(())
    }
}

/// What a single physical column stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnPurpose {
    /// Discriminator byte.
    Tag,
    Boolean,
    Numeric,
    DateTime,
    String,
    Binary,
    Uuid,
    /// Referenced type code of a multi-type reference.
    TypeCode,
    /// Referenced row identity.
    Entity,
    Version,
    Integer,
}

impl From<UnionTag> for ColumnPurpose {
    fn from(tag: UnionTag) -> Self {
        match tag {
            UnionTag::Tag => ColumnPurpose::Tag,
            UnionTag::Boolean => ColumnPurpose::Boolean,
            UnionTag::Numeric => ColumnPurpose::Numeric,
            UnionTag::DateTime => ColumnPurpose::DateTime,
            UnionTag::String => ColumnPurpose::String,
            UnionTag::Binary => ColumnPurpose::Binary,
            UnionTag::Uuid => ColumnPurpose::Uuid,
            UnionTag::Entity => ColumnPurpose::Entity,
            UnionTag::Version => ColumnPurpose::Version,
            UnionTag::Integer => ColumnPurpose::Integer,
        }
    }
}

impl ColumnPurpose {
    /// Returns the postfix appended to the logical column name.
    ///
    /// Single-kind primitives are stored under the bare name.
    #[must_use]
    pub fn postfix(&self, union: bool) -> &'static str {
        match (self, union) {
            (ColumnPurpose::Tag, _) => "_TYPE",
            (ColumnPurpose::TypeCode, _) => "_RTRef",
            (ColumnPurpose::Entity, true) => "_RRRef",
            (ColumnPurpose::Entity, false) => "RRef",
            (ColumnPurpose::Boolean, true) => "_L",
            (ColumnPurpose::Numeric, true) => "_N",
            (ColumnPurpose::DateTime, true) => "_T",
            (ColumnPurpose::String, true) => "_S",
            (ColumnPurpose::Binary, true) => "_B",
            (ColumnPurpose::Uuid, true) => "_U",
            (ColumnPurpose::Version, true) => "_V",
            (ColumnPurpose::Integer, true) => "_I",
            (_, false) => "",
        }
    }

    /// Returns the database type literal of the column.
    #[must_use]
    pub fn db_type(&self) -> &'static str {
        match self {
            ColumnPurpose::Tag | ColumnPurpose::Boolean => "binary(1)",
            ColumnPurpose::Numeric => "numeric(19,5)",
            ColumnPurpose::DateTime => "datetime2",
            ColumnPurpose::String => "nvarchar(max)",
            ColumnPurpose::Binary => "varbinary(max)",
            ColumnPurpose::Uuid | ColumnPurpose::Entity => "binary(16)",
            ColumnPurpose::TypeCode => "binary(4)",
            ColumnPurpose::Version => "binary(8)",
            ColumnPurpose::Integer => "bigint",
        }
    }

    /// Returns the value a column holds when its kind is not the current one.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            ColumnPurpose::Tag => Value::Tag(DISCRIMINATOR_UNDEFINED),
            ColumnPurpose::Boolean => Value::Boolean(false),
            ColumnPurpose::Numeric => Value::Numeric(0.0),
            ColumnPurpose::DateTime => Value::DateTime(
                NaiveDate::from_ymd_opt(2001, 1, 1)
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .unwrap_or_default(),
            ),
            ColumnPurpose::String => Value::String(String::new()),
            ColumnPurpose::Binary => Value::Binary(Vec::new()),
            ColumnPurpose::Uuid => Value::Uuid(Uuid::nil()),
            ColumnPurpose::TypeCode => Value::TypeCode(TYPE_CODE_ANY),
            ColumnPurpose::Entity => Value::Entity(Entity::UNDEFINED),
            ColumnPurpose::Version => Value::Version(0),
            ColumnPurpose::Integer => Value::Integer(0),
        }
    }

    /// Returns the SQL literal of [`ColumnPurpose::default_value`].
    #[must_use]
    pub fn default_literal(&self) -> &'static str {
        match self {
            ColumnPurpose::Tag => "0x01",
            ColumnPurpose::Boolean => "0x00",
            ColumnPurpose::Numeric | ColumnPurpose::Integer => "0",
            ColumnPurpose::DateTime => "'2001-01-01 00:00:00'",
            ColumnPurpose::String => "N''",
            ColumnPurpose::Binary => "0x",
            ColumnPurpose::Uuid | ColumnPurpose::Entity => "0x00000000000000000000000000000000",
            ColumnPurpose::TypeCode => "0x00000000",
            ColumnPurpose::Version => "0x0000000000000000",
        }
    }

    /// Returns the logical kind stored by this column, if it stores one.
    #[must_use]
    pub fn tag(&self) -> Option<UnionTag> {
        match self {
            ColumnPurpose::Tag | ColumnPurpose::TypeCode => None,
            ColumnPurpose::Boolean => Some(UnionTag::Boolean),
            ColumnPurpose::Numeric => Some(UnionTag::Numeric),
            ColumnPurpose::DateTime => Some(UnionTag::DateTime),
            ColumnPurpose::String => Some(UnionTag::String),
            ColumnPurpose::Binary => Some(UnionTag::Binary),
            ColumnPurpose::Uuid => Some(UnionTag::Uuid),
            ColumnPurpose::Entity => Some(UnionTag::Entity),
            ColumnPurpose::Version => Some(UnionTag::Version),
            ColumnPurpose::Integer => Some(UnionTag::Integer),
        }
    }
}

/// Encodes a type code as the `binary(4)` literal stored in `_RTRef` columns.
#[must_use]
pub fn type_code_literal(type_code: i32) -> String {
    format!("0x{:08X}", type_code.max(TYPE_CODE_ANY))
}

/// Encodes a discriminator byte as a `binary(1)` literal.
#[must_use]
pub fn discriminator_literal(discriminator: u8) -> String {
    format!("0x{discriminator:02X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_type_codes() {
        assert_eq!(merge_type_codes(-1, -1), -1);
        assert_eq!(merge_type_codes(-1, 7), 7);
        assert_eq!(merge_type_codes(7, 7), 7);
        assert_eq!(merge_type_codes(7, 8), 0);
        assert_eq!(merge_type_codes(0, 7), 0);
        assert_eq!(merge_type_codes(7, 0), 0);
    }

    #[test]
    fn test_is_union() {
        assert!(!UnionType::undefined().is_union());
        assert!(!UnionType::from_tag(UnionTag::String).is_union());
        assert!(!UnionType::entity(42).is_union());
        assert!(UnionType::entity(0).is_union());
        assert!(UnionType::of(&[UnionTag::String, UnionTag::Numeric]).is_union());
        // The discriminator is not a value kind.
        assert!(!UnionType::from_tag(UnionTag::String).with_tag().is_union());
    }

    #[test]
    fn test_merging_references() {
        let mut t = UnionType::entity(10);
        t.merge(&UnionType::entity(10));
        assert_eq!(t.single_reference(), Some(10));

        t.merge(&UnionType::entity(11));
        assert_eq!(t.type_code(), 0);
        assert!(t.is_union());

        t.merge(&UnionType::entity(10));
        assert_eq!(t.type_code(), 0);
    }

    #[test]
    fn test_column_purposes() {
        assert_eq!(
            UnionType::from_tag(UnionTag::Numeric).column_purposes(),
            vec![ColumnPurpose::Numeric]
        );
        assert_eq!(
            UnionType::entity(5).column_purposes(),
            vec![ColumnPurpose::Entity]
        );
        assert_eq!(
            UnionType::entity(0).column_purposes(),
            vec![ColumnPurpose::Tag, ColumnPurpose::TypeCode, ColumnPurpose::Entity]
        );
        assert_eq!(
            UnionType::of(&[UnionTag::String, UnionTag::Boolean, UnionTag::Entity]).column_purposes(),
            vec![
                ColumnPurpose::Tag,
                ColumnPurpose::Boolean,
                ColumnPurpose::String,
                ColumnPurpose::TypeCode,
                ColumnPurpose::Entity,
            ]
        );
        assert!(UnionType::undefined().column_purposes().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(UnionType::undefined().to_string(), "Undefined");
        assert_eq!(
            UnionType::of(&[UnionTag::String, UnionTag::Boolean]).to_string(),
            "Boolean|String"
        );
        assert_eq!(UnionType::entity(3).to_string(), "Entity(3)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(type_code_literal(42), "0x0000002A");
        assert_eq!(type_code_literal(-1), "0x00000000");
        assert_eq!(discriminator_literal(DISCRIMINATOR_ENTITY), "0x08");
        assert_eq!(ColumnPurpose::Tag.default_literal(), "0x01");
    }
}
