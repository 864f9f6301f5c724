//! Entity, property and column mappers.

use serde::{Deserialize, Serialize};

use crate::catalog::{names_equal, EntityDefinition};
use crate::types::{ColumnPurpose, UnionType};

/// One physical column of a result set or table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapper {
    /// Position in the enclosing [`EntityMapper`], starting at 0.
    pub ordinal: usize,
    /// Physical column name.
    pub name: String,
    /// Database type literal, e.g. `nvarchar(max)`.
    pub type_literal: String,
    pub purpose: ColumnPurpose,
}

/// One logical property and the physical columns it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMapper {
    pub name: String,
    pub union_type: UnionType,
    /// Physical columns in storage order.
    pub columns: Vec<ColumnMapper>,
}

impl PropertyMapper {
    /// Returns the column with the given purpose.
    #[must_use]
    pub fn column(&self, purpose: ColumnPurpose) -> Option<&ColumnMapper> {
        self.columns.iter().find(|c| c.purpose == purpose)
    }
}

/// Ordered physical layout of a row.
///
/// Ordinals run from 0 to `column_count() - 1` across all properties without
/// gaps; result-set readers address columns by ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMapper {
    properties: Vec<PropertyMapper>,
}

impl EntityMapper {
    /// Returns the properties in declaration or projection order.
    #[must_use]
    pub fn properties(&self) -> &[PropertyMapper] {
        &self.properties
    }

    /// Returns a property by name, ignoring case.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyMapper> {
        self.properties.iter().find(|p| names_equal(&p.name, name))
    }

    /// Iterates over every physical column in ordinal order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnMapper> {
        self.properties.iter().flat_map(|p| p.columns.iter())
    }

    /// Returns the number of physical columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.properties.iter().map(|p| p.columns.len()).sum()
    }
}

/// Builds an [`EntityMapper`] with one ordinal counter for all properties.
#[derive(Debug, Default)]
pub(crate) struct EntityMapBuilder {
    ordinal: usize,
    properties: Vec<PropertyMapper>,
}

impl EntityMapBuilder {
    pub(crate) fn new() -> Self {
        EntityMapBuilder::default()
    }

    /// Appends a property whose physical columns are named `base` plus the
    /// postfix of each column purpose.
    ///
    /// A property of undefined type (a `NULL` projection) still occupies a
    /// discriminator column holding the undefined tag.
    pub(crate) fn add_property(&mut self, name: &str, base: &str, union_type: UnionType) {
        let union = union_type.is_union();
        let purposes = if union_type.is_undefined() {
            vec![ColumnPurpose::Tag]
        } else {
            union_type.column_purposes()
        };

        let columns = purposes
            .into_iter()
            .map(|purpose| {
                let column = ColumnMapper {
                    ordinal: self.ordinal,
                    name: format!("{base}{}", purpose.postfix(union)),
                    type_literal: purpose.db_type().to_string(),
                    purpose,
                };
                self.ordinal += 1;
                column
            })
            .collect();

        self.properties.push(PropertyMapper {
            name: name.to_string(),
            union_type,
            columns,
        });
    }

    pub(crate) fn build(self) -> EntityMapper {
        EntityMapper {
            properties: self.properties,
        }
    }
}

/// Maps a schema object: properties in declaration order, each named after
/// its physical base column.
#[must_use]
pub fn create_entity_map(definition: &EntityDefinition) -> EntityMapper {
    let mut builder = EntityMapBuilder::new();
    for property in &definition.properties {
        builder.add_property(&property.name, &property.column_name, property.union_type);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PropertyDefinition;
    use crate::types::UnionTag;

    fn product() -> EntityDefinition {
        EntityDefinition::new(
            42,
            "Справочник.Товар",
            "_Reference42",
            vec![
                PropertyDefinition::new("Ссылка", "_ID", UnionType::entity(42)),
                PropertyDefinition::new("Код", "_Code", UnionTag::String.into()),
                PropertyDefinition::new(
                    "Реквизит",
                    "_Fld7",
                    UnionType::of(&[UnionTag::Boolean, UnionTag::Numeric, UnionTag::Entity]),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_schema_entity_map() {
        let map = create_entity_map(&product());
        let names: Vec<&str> = map.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["_IDRRef", "_Code", "_Fld7_TYPE", "_Fld7_L", "_Fld7_N", "_Fld7_RTRef", "_Fld7_RRRef"]
        );
        let ordinals: Vec<usize> = map.columns().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, (0..7).collect::<Vec<_>>());
        assert_eq!(map.column_count(), 7);
    }

    #[test]
    fn test_property_lookup() {
        let map = create_entity_map(&product());
        let property = map.property("реквизит").unwrap();
        assert_eq!(
            property.column(ColumnPurpose::TypeCode).map(|c| c.type_literal.as_str()),
            Some("binary(4)")
        );
        assert!(property.column(ColumnPurpose::String).is_none());
    }

    #[test]
    fn test_undefined_property_keeps_a_column() {
        let mut builder = EntityMapBuilder::new();
        builder.add_property("Пусто", "Пусто", UnionType::undefined());
        builder.add_property("Число", "Число", UnionTag::Numeric.into());
        let map = builder.build();

        assert_eq!(map.properties()[0].columns[0].purpose, ColumnPurpose::Tag);
        assert_eq!(map.properties()[1].columns[0].ordinal, 1);
        assert_eq!(map.properties()[1].columns[0].name, "Число");
    }
}
