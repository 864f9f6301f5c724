//! Entity maps and mapping rules for bound syntax nodes.

use tracing::debug;

use crate::binder::{Bindings, TableBinding, TypeInferencer};
use crate::error::{Result, UnionSqlError};
use crate::parser::ast::{Ast, NodeId, SyntaxNode};

use super::mapper::{create_entity_map, EntityMapBuilder, EntityMapper};
use super::rules::{create_mapping_rules, PropertyMappingRule};

/// Derives physical layouts and mapping rules from a bound tree.
#[derive(Debug, Clone, Copy)]
pub struct MappingGenerator<'a> {
    ast: &'a Ast,
    bindings: &'a Bindings,
    inferencer: TypeInferencer<'a>,
}

impl<'a> MappingGenerator<'a> {
    /// Creates a generator over a bound tree.
    #[must_use]
    pub fn new(ast: &'a Ast, bindings: &'a Bindings) -> Self {
        MappingGenerator {
            ast,
            bindings,
            inferencer: TypeInferencer::new(ast, bindings),
        }
    }

    /// Builds the physical layout of a row source.
    ///
    /// Accepts select expressions and statements (projection order, unions
    /// use their first arm), OUTPUT clauses, and bound table references or
    /// INTO targets.
    ///
    /// # Errors
    ///
    /// Returns [`UnionSqlError::Mapping`] for nodes that produce no rows or
    /// table nodes the binder left unbound.
    pub fn create_entity_map(&self, node: NodeId) -> Result<EntityMapper> {
        match &self.ast[node] {
            SyntaxNode::SelectExpression(select) => Ok(self.projection_map(&select.columns)),
            SyntaxNode::Output(output) => Ok(self.projection_map(&output.columns)),
            SyntaxNode::TableUnion(union) => self.create_entity_map(union.left),
            SyntaxNode::Group(group) => self.create_entity_map(group.expression),
            SyntaxNode::Select(statement) => self.create_entity_map(statement.expression),
            SyntaxNode::CommonTable(common_table) => self.create_entity_map(common_table.expression),
            SyntaxNode::TableExpression(table) => self.create_entity_map(table.expression),
            SyntaxNode::TableReference(_) | SyntaxNode::Into(_) => {
                let table = self
                    .bindings
                    .get(node)
                    .and_then(|binding| binding.as_table())
                    .ok_or_else(|| UnionSqlError::Mapping(format!("table node {node} is not bound")))?;
                self.table_map(table)
            }
            other => Err(UnionSqlError::Mapping(format!(
                "node {node} of kind {:?} has no row layout",
                other.kind()
            ))),
        }
    }

    fn table_map(&self, table: &TableBinding) -> Result<EntityMapper> {
        if let Some(definition) = table.definition() {
            return Ok(create_entity_map(definition));
        }
        match table.source_node() {
            Some(source) => self.create_entity_map(source),
            None => Err(UnionSqlError::Mapping(format!("table {table:?} has no row source"))),
        }
    }

    /// Unnamed expressions are projected as `_col<index>`.
    fn projection_map(&self, columns: &[NodeId]) -> EntityMapper {
        let mut builder = EntityMapBuilder::new();
        for (index, column) in columns.iter().enumerate() {
            let inferred = self.inferencer.infer(*column);
            let name = inferred.name.unwrap_or_else(|| format!("_col{index}"));
            builder.add_property(&name, &name, inferred.union_type);
        }
        builder.build()
    }

    /// Maps the source rows of an INSERT, or the unmatched source rows of an
    /// UPSERT, onto the target by property name.
    ///
    /// # Errors
    ///
    /// Returns [`UnionSqlError::Mapping`] if `node` is neither statement or
    /// its target or source cannot be mapped.
    pub fn create_insert_rules(&self, node: NodeId) -> Result<Vec<PropertyMappingRule>> {
        let (target, source) = match &self.ast[node] {
            SyntaxNode::Insert(insert) => (insert.target, insert.source),
            SyntaxNode::Upsert(upsert) => (upsert.target, upsert.source),
            _ => {
                return Err(UnionSqlError::Mapping(format!(
                    "node {node} is not an INSERT or UPSERT"
                )))
            }
        };
        let target = self.create_entity_map(target)?;
        let source = self.create_entity_map(source)?;
        debug!(%node, target = target.column_count(), source = source.column_count(), "insert mapping");
        create_mapping_rules(&target, &source, None)
    }

    /// Maps the SET clause of an UPDATE or UPSERT onto its target; only the
    /// assigned properties produce rules. An insert-only UPSERT has none.
    ///
    /// # Errors
    ///
    /// Returns [`UnionSqlError::Mapping`] if `node` is neither statement or
    /// its target cannot be mapped.
    pub fn create_update_rules(&self, node: NodeId) -> Result<Vec<PropertyMappingRule>> {
        let (target, set) = match &self.ast[node] {
            SyntaxNode::Update(update) => (update.target, &update.set),
            SyntaxNode::Upsert(upsert) if upsert.ignore_update => return Ok(Vec::new()),
            SyntaxNode::Upsert(upsert) => (upsert.target, &upsert.set),
            _ => {
                return Err(UnionSqlError::Mapping(format!(
                    "node {node} is not an UPDATE or UPSERT"
                )))
            }
        };
        let target = self.create_entity_map(target)?;

        let mut builder = EntityMapBuilder::new();
        let mut set_mapping = Vec::with_capacity(set.len());
        for set_node in set {
            let SyntaxNode::SetExpression(assignment) = &self.ast[*set_node] else {
                return Err(UnionSqlError::Mapping(format!("{set_node} is not a SET expression")));
            };
            let SyntaxNode::ColumnReference(column) = &self.ast[assignment.column] else {
                return Err(UnionSqlError::Mapping(format!(
                    "SET target {} is not a column",
                    assignment.column
                )));
            };
            let name = column.column_name();
            let inferred = self.inferencer.infer(assignment.initializer);
            builder.add_property(name, name, inferred.union_type);
            set_mapping.push((name.to_string(), name.to_string()));
        }

        create_mapping_rules(&target, &builder.build(), Some(&set_mapping))
    }
}
