//! Target/source mapping rules for data modification statements.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, UnionSqlError};
use crate::types::{
    discriminator_literal, type_code_literal, ColumnPurpose, UnionTag, UnionType,
    DISCRIMINATOR_ENTITY, DISCRIMINATOR_UNDEFINED, TYPE_CODE_ANY,
};

use super::mapper::{ColumnMapper, EntityMapper, PropertyMapper};

/// Where a target column takes its value from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSource {
    /// Copied from a source column of the same purpose.
    Column(ColumnMapper),
    /// Synthesized discriminator byte.
    Discriminator(u8),
    /// Synthesized referenced type code.
    TypeCode(i32),
    /// Default value of the column purpose.
    Default(ColumnPurpose),
}

impl ColumnSource {
    /// Returns the SQL literal of a synthesized value; `None` for copied
    /// columns.
    #[must_use]
    pub fn literal(&self) -> Option<String> {
        match self {
            ColumnSource::Column(_) => None,
            ColumnSource::Discriminator(discriminator) => Some(discriminator_literal(*discriminator)),
            ColumnSource::TypeCode(type_code) => Some(type_code_literal(*type_code)),
            ColumnSource::Default(purpose) => Some(purpose.default_literal().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMappingRule {
    pub target: ColumnMapper,
    pub source: ColumnSource,
}

/// Mapping of one target property, expanded to its physical columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMappingRule {
    pub target: PropertyMapper,
    /// `None` when no source property matched the target.
    pub source: Option<PropertyMapper>,
    /// One rule per target column, in target column order.
    pub columns: Vec<ColumnMappingRule>,
}

/// Creates property mapping rules from `source` into `target`.
///
/// Without a SET mapping every target property is matched by name against
/// the source and left without a source when absent. With one, only the
/// listed `(target, source)` property pairs are mapped.
///
/// # Errors
///
/// Returns [`UnionSqlError::Mapping`] if a SET mapping names a property the
/// target or source does not have.
pub fn create_mapping_rules(
    target: &EntityMapper,
    source: &EntityMapper,
    set_mapping: Option<&[(String, String)]>,
) -> Result<Vec<PropertyMappingRule>> {
    let Some(set_mapping) = set_mapping else {
        return Ok(target
            .properties()
            .iter()
            .map(|property| create_property_rule(property, source.property(&property.name)))
            .collect());
    };

    set_mapping
        .iter()
        .map(|(target_name, source_name)| {
            let target_property = target.property(target_name).ok_or_else(|| {
                UnionSqlError::Mapping(format!("target has no property '{target_name}'"))
            })?;
            let source_property = source.property(source_name).ok_or_else(|| {
                UnionSqlError::Mapping(format!("source has no property '{source_name}'"))
            })?;
            Ok(create_property_rule(target_property, Some(source_property)))
        })
        .collect()
}

fn create_property_rule(target: &PropertyMapper, source: Option<&PropertyMapper>) -> PropertyMappingRule {
    let columns = target
        .columns
        .iter()
        .map(|column| ColumnMappingRule {
            target: column.clone(),
            source: column_source(column.purpose, target.union_type, source),
        })
        .collect();

    trace!(
        target = %target.name,
        source = source.map(|s| s.name.as_str()),
        "property mapping rule"
    );

    PropertyMappingRule {
        target: target.clone(),
        source: source.cloned(),
        columns,
    }
}

fn column_source(purpose: ColumnPurpose, target: UnionType, source: Option<&PropertyMapper>) -> ColumnSource {
    // A NULL source only carries a placeholder discriminator column.
    let source = source.filter(|s| !s.union_type.is_undefined());
    if let Some(column) = source.and_then(|s| s.column(purpose)) {
        return ColumnSource::Column(column.clone());
    }
    let source_type = source.map(|s| s.union_type);
    match purpose {
        ColumnPurpose::Tag => ColumnSource::Discriminator(discriminator_for(target, source_type)),
        ColumnPurpose::TypeCode => ColumnSource::TypeCode(
            source_type
                .and_then(|t| t.single_reference())
                .unwrap_or(TYPE_CODE_ANY),
        ),
        purpose => ColumnSource::Default(purpose),
    }
}

/// Chooses the discriminator stored for a source without one of its own.
fn discriminator_for(target: UnionType, source: Option<UnionType>) -> u8 {
    let Some(source) = source else {
        return DISCRIMINATOR_UNDEFINED;
    };
    if source.is_union() || source.has(UnionTag::Entity) {
        return if target.has(UnionTag::Entity) {
            DISCRIMINATOR_ENTITY
        } else {
            DISCRIMINATOR_UNDEFINED
        };
    }
    match source.single_tag() {
        Some(tag) if target.has(tag) => tag.discriminator().unwrap_or(DISCRIMINATOR_UNDEFINED),
        _ => DISCRIMINATOR_UNDEFINED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::mapper::EntityMapBuilder;

    fn map(properties: &[(&str, UnionType)]) -> EntityMapper {
        let mut builder = EntityMapBuilder::new();
        for (name, union_type) in properties {
            builder.add_property(name, name, *union_type);
        }
        builder.build()
    }

    #[test]
    fn test_primitive_into_reference_target() {
        let target = map(&[(
            "Владелец",
            UnionType::of(&[UnionTag::Entity, UnionTag::String]).with_tag(),
        )]);
        let source = map(&[("Владелец", UnionTag::Numeric.into())]);
        let rules = create_mapping_rules(&target, &source, None).unwrap();

        let tag = &rules[0].columns[0];
        assert_eq!(tag.target.purpose, ColumnPurpose::Tag);
        assert_eq!(tag.source, ColumnSource::Discriminator(DISCRIMINATOR_UNDEFINED));

        let source = map(&[("Владелец", UnionTag::String.into())]);
        let rules = create_mapping_rules(&target, &source, None).unwrap();
        assert_eq!(rules[0].columns[0].source, ColumnSource::Discriminator(0x05));
    }

    #[test]
    fn test_single_reference_source() {
        let target = map(&[("Ссылка", UnionType::of(&[UnionTag::Entity, UnionTag::Boolean]))]);
        let source = map(&[("Ссылка", UnionType::entity(42))]);
        let rules = create_mapping_rules(&target, &source, None).unwrap();
        let sources: Vec<&ColumnSource> = rules[0].columns.iter().map(|c| &c.source).collect();

        assert_eq!(sources[0], &ColumnSource::Discriminator(DISCRIMINATOR_ENTITY));
        assert_eq!(sources[1], &ColumnSource::Default(ColumnPurpose::Boolean));
        assert_eq!(sources[2], &ColumnSource::TypeCode(42));
        assert!(matches!(sources[3], ColumnSource::Column(c) if c.purpose == ColumnPurpose::Entity));
        assert_eq!(sources[2].literal().as_deref(), Some("0x0000002A"));
    }

    #[test]
    fn test_null_source_falls_back_to_defaults() {
        let target = map(&[(
            "Реквизит",
            UnionType::of(&[UnionTag::Boolean, UnionTag::String]).with_tag(),
        )]);
        let source = map(&[("Реквизит", UnionType::undefined())]);
        let rules = create_mapping_rules(&target, &source, None).unwrap();
        let sources: Vec<&ColumnSource> = rules[0].columns.iter().map(|c| &c.source).collect();

        assert!(rules[0].source.is_some());
        assert_eq!(
            sources,
            vec![
                &ColumnSource::Discriminator(DISCRIMINATOR_UNDEFINED),
                &ColumnSource::Default(ColumnPurpose::Boolean),
                &ColumnSource::Default(ColumnPurpose::String),
            ]
        );
    }

    #[test]
    fn test_missing_source_property() {
        let target = map(&[("Код", UnionTag::String.into())]);
        let source = map(&[("Имя", UnionTag::String.into())]);
        let rules = create_mapping_rules(&target, &source, None).unwrap();
        assert!(rules[0].source.is_none());
        assert_eq!(rules[0].columns[0].source.literal().as_deref(), Some("N''"));
    }

    #[test]
    fn test_set_mapping_limits_properties() {
        let target = map(&[("Код", UnionTag::String.into()), ("Имя", UnionTag::String.into())]);
        let source = map(&[("Имя", UnionTag::String.into())]);
        let set = vec![("Имя".to_string(), "Имя".to_string())];
        let rules = create_mapping_rules(&target, &source, Some(&set)).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].source.as_ref().map(|s| s.name.as_str()), Some("Имя"));

        let set = vec![("Нет".to_string(), "Имя".to_string())];
        assert!(create_mapping_rules(&target, &source, Some(&set)).is_err());
    }
}
