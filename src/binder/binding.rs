//! Resolved targets attached to syntax nodes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{EntityDefinition, EnumMember};
use crate::parser::ast::NodeId;
use crate::types::{Entity, UnionTag, UnionType};

/// What a name-reference node resolved to.
#[derive(Debug, Clone)]
pub enum Binding {
    /// Table source: table reference, derived table, CTE or INTO target.
    Table(TableBinding),
    /// Column resolved to a schema property.
    Property {
        entity: Arc<EntityDefinition>,
        index: usize,
    },
    /// Column resolved to a projected [`ColumnExpression`] node of a derived
    /// table, CTE, temporary table or table variable.
    ///
    /// [`ColumnExpression`]: crate::parser::ast::ColumnExpression
    Column(NodeId),
    /// Variable reference.
    Variable(VariableBinding),
    /// Qualified enumeration member, e.g. `Перечисление.Статус.Новый`.
    EnumValue(EnumMember),
    /// Declared type of a DECLARE statement.
    Type(VariableBinding),
    /// Built-in function with a fixed result type.
    Function(BuiltinFunction),
}

impl Binding {
    /// Returns the table binding, if this is one.
    #[must_use]
    pub fn as_table(&self) -> Option<&TableBinding> {
        match self {
            Binding::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Returns the variable binding of a variable or type binding.
    #[must_use]
    pub fn as_variable(&self) -> Option<&VariableBinding> {
        match self {
            Binding::Variable(variable) | Binding::Type(variable) => Some(variable),
            _ => None,
        }
    }
}

/// A table-like object that columns can be resolved against.
#[derive(Debug, Clone)]
pub enum TableBinding {
    /// Schema object.
    Entity(Arc<EntityDefinition>),
    /// Table-valued parameter: a variable declared with a schema record type.
    Parameter {
        name: String,
        definition: Arc<EntityDefinition>,
    },
    /// Derived table; the node is its select expression or union.
    Derived(NodeId),
    /// Common table expression; the node is the [`CommonTable`].
    ///
    /// [`CommonTable`]: crate::parser::ast::CommonTable
    CommonTable(NodeId),
    /// `#name` created by `SELECT ... INTO`.
    TemporaryTable { name: String, source: NodeId },
    /// `@name` created by `SELECT ... INTO` or `OUTPUT ... INTO`.
    TableVariable { name: String, source: NodeId },
}

impl TableBinding {
    /// Returns the schema definition of schema-backed sources.
    #[must_use]
    pub fn definition(&self) -> Option<&Arc<EntityDefinition>> {
        match self {
            TableBinding::Entity(definition) | TableBinding::Parameter { definition, .. } => {
                Some(definition)
            }
            _ => None,
        }
    }

    /// Returns the node whose projection defines the columns of a
    /// script-defined source.
    #[must_use]
    pub fn source_node(&self) -> Option<NodeId> {
        match self {
            TableBinding::Derived(node)
            | TableBinding::CommonTable(node)
            | TableBinding::TemporaryTable { source: node, .. }
            | TableBinding::TableVariable { source: node, .. } => Some(*node),
            TableBinding::Entity(_) | TableBinding::Parameter { .. } => None,
        }
    }
}

/// Type of a declared variable.
#[derive(Debug, Clone)]
pub enum VariableBinding {
    /// Primitive-typed scalar.
    Primitive(UnionType),
    /// Reference; the type code is `0` until narrowed to a concrete type.
    Entity(Entity),
    /// Schema-defined record type used as a table-valued parameter.
    Record(Arc<EntityDefinition>),
}

impl VariableBinding {
    /// Returns the scalar type of the variable, if it is a scalar.
    #[must_use]
    pub fn union_type(&self) -> Option<UnionType> {
        match self {
            VariableBinding::Primitive(union_type) => Some(*union_type),
            VariableBinding::Entity(entity) => Some(UnionType::entity(entity.type_code)),
            VariableBinding::Record(_) => None,
        }
    }
}

/// Entry of the built-in function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub result: UnionTag,
}

/// Functions with a fixed result type. Any other function infers as the
/// merge of its argument types.
pub const BUILTIN_FUNCTIONS: [BuiltinFunction; 15] = [
    BuiltinFunction { name: "COUNT", result: UnionTag::Integer },
    BuiltinFunction { name: "ROW_NUMBER", result: UnionTag::Version },
    BuiltinFunction { name: "SUBSTRING", result: UnionTag::String },
    BuiltinFunction { name: "CONCAT", result: UnionTag::String },
    BuiltinFunction { name: "LOWER", result: UnionTag::String },
    BuiltinFunction { name: "UPPER", result: UnionTag::String },
    BuiltinFunction { name: "LTRIM", result: UnionTag::String },
    BuiltinFunction { name: "RTRIM", result: UnionTag::String },
    BuiltinFunction { name: "REPLACE", result: UnionTag::String },
    BuiltinFunction { name: "CHARLENGTH", result: UnionTag::Integer },
    BuiltinFunction { name: "NOW", result: UnionTag::DateTime },
    BuiltinFunction { name: "UTC", result: UnionTag::DateTime },
    BuiltinFunction { name: "DATEADD", result: UnionTag::DateTime },
    BuiltinFunction { name: "UUIDOF", result: UnionTag::Uuid },
    BuiltinFunction { name: "TYPEOF", result: UnionTag::Integer },
];

impl BuiltinFunction {
    /// Looks up a built-in function by name, ignoring case.
    #[must_use]
    pub fn lookup(name: &str) -> Option<BuiltinFunction> {
        BUILTIN_FUNCTIONS
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .copied()
    }
}

/// Side table of bindings keyed by node.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<NodeId, Binding>,
}

impl Bindings {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Bindings {
            map: HashMap::new(),
        }
    }

    /// Attaches a binding to a node, replacing any previous one.
    pub fn insert(&mut self, node: NodeId, binding: Binding) {
        self.map.insert(node, binding);
    }

    /// Returns the binding of a node.
    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<&Binding> {
        self.map.get(&node)
    }

    /// Returns true if the node is bound.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.map.contains_key(&node)
    }

    /// Returns the number of bound nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over all bindings.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Binding)> {
        self.map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(BuiltinFunction::lookup("count").map(|f| f.result), Some(UnionTag::Integer));
        assert_eq!(BuiltinFunction::lookup("UuidOf").map(|f| f.result), Some(UnionTag::Uuid));
        assert!(BuiltinFunction::lookup("ISNULL").is_none());
    }

    #[test]
    fn test_entity_variable_type() {
        let narrowed = VariableBinding::Entity(Entity::of_type(42));
        assert_eq!(narrowed.union_type().and_then(|t| t.single_reference()), Some(42));

        let open = VariableBinding::Entity(Entity::UNDEFINED);
        assert!(open.union_type().is_some_and(|t| t.is_union()));
    }
}
