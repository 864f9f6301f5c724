//! Schema object definitions and the in-memory catalog.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, UnionSqlError};
use crate::types::{Entity, UnionType};

use super::SchemaProvider;

/// Normalizes a schema or script name for case-insensitive comparison.
#[must_use]
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Returns true if two names are equal ignoring case.
#[must_use]
pub fn names_equal(left: &str, right: &str) -> bool {
    left == right || name_key(left) == name_key(right)
}

/// Schema definition of a table-like object (catalog, document, register,
/// or a user-defined record type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Reference type code of the object.
    pub type_code: i32,
    /// Qualified logical name, e.g. `Справочник.Товар`.
    pub name: String,
    /// Physical table name.
    pub table_name: String,
    /// Properties in declaration order.
    pub properties: Vec<PropertyDefinition>,
}

impl EntityDefinition {
    /// Creates a new entity definition with validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the object has no properties or two properties
    /// share a name.
    pub fn new(
        type_code: i32,
        name: impl Into<String>,
        table_name: impl Into<String>,
        properties: Vec<PropertyDefinition>,
    ) -> Result<Self> {
        let definition = EntityDefinition {
            type_code,
            name: name.into(),
            table_name: table_name.into(),
            properties,
        };
        definition.validate()?;
        Ok(definition)
    }

    fn validate(&self) -> Result<()> {
        if self.properties.is_empty() {
            return Err(UnionSqlError::Schema(format!(
                "Object '{}' must have at least one property",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(name_key(&property.name)) {
                return Err(UnionSqlError::Schema(format!(
                    "Duplicate property name '{}' in '{}'",
                    property.name, self.name
                )));
            }
        }

        Ok(())
    }

    /// Finds a property by name, ignoring case.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| names_equal(&p.name, name))
    }

    /// Finds the index of a property by name, ignoring case.
    #[must_use]
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| names_equal(&p.name, name))
    }
}

/// A logical property and its physical encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Logical property name.
    pub name: String,
    /// Base physical column name, e.g. `_Fld123`.
    pub column_name: String,
    /// Admitted kinds; union properties carry the discriminator flag.
    pub union_type: UnionType,
}

impl PropertyDefinition {
    /// Creates a property definition.
    ///
    /// Union-typed properties always store a discriminator column, so the
    /// discriminator flag is set for them.
    #[must_use]
    pub fn new(name: impl Into<String>, column_name: impl Into<String>, union_type: UnionType) -> Self {
        let union_type = if union_type.is_union() {
            union_type.with_tag()
        } else {
            union_type
        };
        PropertyDefinition {
            name: name.into(),
            column_name: column_name.into(),
            union_type,
        }
    }
}

/// A member of a schema enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    /// Qualified enumeration name, e.g. `Перечисление.Статус`.
    pub enum_name: String,
    /// Member name.
    pub name: String,
    /// Reference type code of the enumeration.
    pub type_code: i32,
    /// Identity of the member row.
    pub identity: Uuid,
}

impl EnumMember {
    /// Returns the member as a reference value.
    #[must_use]
    pub fn value(&self) -> Entity {
        Entity::new(self.type_code, self.identity)
    }
}

/// In-memory schema registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Objects by normalized name.
    objects: HashMap<String, Arc<EntityDefinition>>,
    /// Enumeration members by normalized qualified member name.
    #[serde(default)]
    enum_members: HashMap<String, EnumMember>,
}

impl Catalog {
    /// Creates a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Catalog {
            objects: HashMap::new(),
            enum_members: HashMap::new(),
        }
    }

    /// Registers an object definition.
    ///
    /// # Errors
    ///
    /// Returns an error if an object with the same name or type code exists.
    pub fn add_entity(&mut self, definition: EntityDefinition) -> Result<Arc<EntityDefinition>> {
        let key = name_key(&definition.name);
        if self.objects.contains_key(&key) {
            return Err(UnionSqlError::Schema(format!(
                "Object '{}' already exists",
                definition.name
            )));
        }
        if definition.type_code > 0
            && self
                .objects
                .values()
                .any(|o| o.type_code == definition.type_code)
        {
            return Err(UnionSqlError::Schema(format!(
                "Type code {} of '{}' is already in use",
                definition.type_code, definition.name
            )));
        }
        let definition = Arc::new(definition);
        self.objects.insert(key, Arc::clone(&definition));
        Ok(definition)
    }

    /// Registers an enumeration and its members.
    ///
    /// # Errors
    ///
    /// Returns an error if a member name repeats.
    pub fn add_enum(
        &mut self,
        enum_name: &str,
        type_code: i32,
        members: &[(&str, Uuid)],
    ) -> Result<()> {
        for (member, identity) in members {
            let key = name_key(&format!("{enum_name}.{member}"));
            if self.enum_members.contains_key(&key) {
                return Err(UnionSqlError::Schema(format!(
                    "Duplicate enumeration member '{enum_name}.{member}'"
                )));
            }
            self.enum_members.insert(
                key,
                EnumMember {
                    enum_name: enum_name.to_string(),
                    name: (*member).to_string(),
                    type_code,
                    identity: *identity,
                },
            );
        }
        Ok(())
    }

    /// Retrieves an object by name.
    #[must_use]
    pub fn get_entity(&self, name: &str) -> Option<Arc<EntityDefinition>> {
        self.objects.get(&name_key(name)).cloned()
    }

    /// Finds an object by reference type code.
    #[must_use]
    pub fn entity_by_type_code(&self, type_code: i32) -> Option<Arc<EntityDefinition>> {
        self.objects
            .values()
            .find(|o| o.type_code == type_code)
            .cloned()
    }
}

impl SchemaProvider for Catalog {
    fn get_metadata_object(&self, name: &str) -> Result<Option<Arc<EntityDefinition>>> {
        Ok(self.get_entity(name))
    }

    fn try_get_enum_value(&self, qualified_name: &str) -> Result<Option<EnumMember>> {
        Ok(self.enum_members.get(&name_key(qualified_name)).cloned())
    }
}
