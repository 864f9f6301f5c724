//! Semantic analysis and binding.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::catalog::{names_equal, SchemaProvider};
use crate::error::{BindError, Result, TokenKind, UnionSqlError};
use crate::parser::ast::{
    Ast, ColumnReference, CommonTable, DeclareStatement, DeleteStatement, InsertStatement, NodeId,
    NodeKind, OutputClause, SelectExpression, SyntaxNode, TableReference, UpdateStatement,
    UpsertStatement, VariableReference,
};
use crate::types::{Entity, UnionTag};

use super::binding::{Binding, Bindings, BuiltinFunction, TableBinding, VariableBinding};
use super::config::BinderConfig;
use super::inference::TypeInferencer;
use super::scope::{is_pseudo_table, AliasTarget, ScopeId, ScopeTree};

/// Output of a binding pass.
#[derive(Debug)]
pub struct BoundScript {
    scopes: ScopeTree,
    bindings: Bindings,
    diagnostics: Vec<BindError>,
}

impl BoundScript {
    /// Returns the scope tree built during binding.
    #[must_use]
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Returns the root scope, if any scope was opened.
    #[must_use]
    pub fn root_scope(&self) -> Option<ScopeId> {
        self.scopes.root()
    }

    /// Returns the binding side table.
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Returns the binding of a node.
    #[must_use]
    pub fn binding(&self, node: NodeId) -> Option<&Binding> {
        self.bindings.get(node)
    }

    /// Returns the collected diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &[BindError] {
        &self.diagnostics
    }

    /// Returns the diagnostics rendered as messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }

    /// Returns true if every name was resolved.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns an inferencer over this binding result.
    #[must_use]
    pub fn inferencer<'a>(&'a self, ast: &'a Ast) -> TypeInferencer<'a> {
        TypeInferencer::new(ast, &self.bindings)
    }

    /// Converts a result with diagnostics into an error.
    ///
    /// Partially bound scripts are not safe for code generation.
    ///
    /// # Errors
    ///
    /// Returns [`UnionSqlError::Bind`] listing every diagnostic.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(UnionSqlError::Bind(self.messages().join("; ")))
        }
    }
}

/// Binds a script with the default configuration.
///
/// # Errors
///
/// Returns an error only for structural violations of the syntax tree;
/// unresolved names are reported as diagnostics.
pub fn bind(ast: &Ast, root: NodeId, schema: &dyn SchemaProvider) -> Result<BoundScript> {
    Binder::new(ast, schema).bind(root)
}

/// Main binder for semantic analysis.
///
/// Walks the syntax tree depth-first, building the scope tree and attaching a
/// [`Binding`] to every name reference it can resolve.
pub struct Binder<'a> {
    ast: &'a Ast,
    schema: &'a dyn SchemaProvider,
    config: BinderConfig,
    scopes: ScopeTree,
    bindings: Bindings,
    diagnostics: Vec<BindError>,
    depth: usize,
}

impl<'a> Binder<'a> {
    /// Creates a new binder with the default configuration.
    #[must_use]
    pub fn new(ast: &'a Ast, schema: &'a dyn SchemaProvider) -> Self {
        Self::with_config(ast, schema, BinderConfig::default())
    }

    /// Creates a new binder with the given configuration.
    #[must_use]
    pub fn with_config(ast: &'a Ast, schema: &'a dyn SchemaProvider, config: BinderConfig) -> Self {
        Binder {
            ast,
            schema,
            config,
            scopes: ScopeTree::new(),
            bindings: Bindings::new(),
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    /// Binds the tree rooted at `root`.
    ///
    /// A failing schema provider stops the walk and is reported as a single
    /// diagnostic; the scope tree then holds only the scopes opened so far.
    ///
    /// # Errors
    ///
    /// Returns a structural error when the tree violates nesting contracts.
    pub fn bind(mut self, root: NodeId) -> Result<BoundScript> {
        match self.bind_node(root) {
            Ok(()) => {}
            Err(UnionSqlError::Schema(message)) => {
                warn!(%message, "schema provider failed, binding stopped");
                self.scopes.close_all();
                self.diagnostics.push(BindError::Schema(message));
            }
            Err(err) => return Err(err),
        }

        debug!(
            bound = self.bindings.len(),
            scopes = self.scopes.len(),
            diagnostics = self.diagnostics.len(),
            "binding finished"
        );

        Ok(BoundScript {
            scopes: self.scopes,
            bindings: self.bindings,
            diagnostics: self.diagnostics,
        })
    }

    fn bind_node(&mut self, node: NodeId) -> Result<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(UnionSqlError::Structure(format!(
                "syntax tree nesting exceeds {} at node {node}",
                self.config.max_depth
            )));
        }
        let result = self.dispatch(node);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, node: NodeId) -> Result<()> {
        let ast = self.ast;
        match &ast[node] {
            SyntaxNode::Script(script) => {
                self.scopes.open_scope(node, NodeKind::Script, false)?;
                for statement in &script.statements {
                    self.bind_node(*statement)?;
                }
                self.scopes.close_scope()?;
                Ok(())
            }
            SyntaxNode::Declare(declare) => self.bind_declare(declare),
            SyntaxNode::TypeIdentifier(_) => Err(structure(node, "type identifier outside of DECLARE")),
            SyntaxNode::Select(select) => {
                debug!(%node, "binding SELECT");
                self.scopes.open_scope(node, NodeKind::Select, false)?;
                self.bind_optional(select.common_tables)?;
                self.bind_query(select.expression, false)?;
                self.scopes.close_scope()?;
                Ok(())
            }
            SyntaxNode::Insert(insert) => self.bind_insert(node, insert),
            SyntaxNode::Update(update) => self.bind_update(node, update),
            SyntaxNode::Delete(delete) => self.bind_delete(node, delete),
            SyntaxNode::Upsert(upsert) => self.bind_upsert(node, upsert),
            SyntaxNode::Consume(consume) => {
                debug!(%node, "binding CONSUME");
                self.scopes.open_scope(node, NodeKind::Consume, false)?;
                self.bind_query(consume.expression, false)?;
                self.scopes.close_scope()?;
                Ok(())
            }
            SyntaxNode::CommonTables(common_tables) => self.bind_all(&common_tables.tables),
            SyntaxNode::CommonTable(common_table) => self.bind_common_table(node, common_table),
            // Reached only in expression position: a correlated subquery.
            SyntaxNode::SelectExpression(select) => self.bind_select_expression(node, select, true),
            SyntaxNode::TableUnion(union) => {
                self.bind_query(union.left, true)?;
                self.bind_query(union.right, true)
            }
            SyntaxNode::TableReference(table) => self.bind_table_reference(node, table),
            SyntaxNode::TableExpression(table) => {
                self.bind_query(table.expression, false)?;
                let binding = TableBinding::Derived(table.expression);
                self.bindings.insert(node, Binding::Table(binding.clone()));
                self.scopes.add_alias(&table.alias, AliasTarget { node, binding })
            }
            SyntaxNode::TableJoin(join) => {
                self.bind_node(join.left)?;
                self.bind_node(join.right)?;
                self.bind_optional(join.on)
            }
            SyntaxNode::ColumnExpression(column) => self.bind_node(column.expression),
            SyntaxNode::ColumnReference(column) => self.bind_column(node, column),
            SyntaxNode::VariableReference(variable) => {
                self.bind_variable(node, variable);
                Ok(())
            }
            SyntaxNode::ScalarLiteral(_) => Ok(()),
            SyntaxNode::Unary(unary) => self.bind_node(unary.expression),
            SyntaxNode::Binary(binary) => {
                self.bind_node(binary.left)?;
                self.bind_node(binary.right)
            }
            SyntaxNode::Comparison(comparison) => {
                self.bind_node(comparison.left)?;
                self.bind_node(comparison.right)
            }
            SyntaxNode::Logical(logical) => {
                self.bind_node(logical.left)?;
                self.bind_node(logical.right)
            }
            SyntaxNode::Group(group) => self.bind_node(group.expression),
            SyntaxNode::Case(case) => {
                self.bind_all(&case.when)?;
                self.bind_optional(case.otherwise)
            }
            SyntaxNode::When(when) => {
                self.bind_node(when.condition)?;
                self.bind_node(when.then)
            }
            SyntaxNode::FunctionCall(function) => {
                if let Some(builtin) = BuiltinFunction::lookup(&function.name) {
                    self.bindings.insert(node, Binding::Function(builtin));
                }
                self.bind_all(&function.arguments)?;
                self.bind_optional(function.over)
            }
            SyntaxNode::Over(over) => {
                self.bind_all(&over.partition)?;
                self.bind_all(&over.order)
            }
            SyntaxNode::OrderItem(item) => self.bind_node(item.expression),
            SyntaxNode::SetExpression(_) => Err(structure(node, "SET outside of UPDATE or UPSERT")),
            SyntaxNode::Output(output) => self.bind_output(node, output),
            SyntaxNode::Into(_) => Err(structure(node, "INTO outside of SELECT or OUTPUT")),
            SyntaxNode::Exists(exists) => self.bind_query(exists.query, true),
            SyntaxNode::InList(in_list) => {
                self.bind_node(in_list.expression)?;
                self.bind_all(&in_list.values)
            }
        }
    }

    fn bind_all(&mut self, nodes: &[NodeId]) -> Result<()> {
        for node in nodes {
            self.bind_node(*node)?;
        }
        Ok(())
    }

    fn bind_optional(&mut self, node: Option<NodeId>) -> Result<()> {
        match node {
            Some(node) => self.bind_node(node),
            None => Ok(()),
        }
    }

    /// Binds a query in table position (statement body, FROM, CTE, union arm).
    fn bind_query(&mut self, node: NodeId, correlated: bool) -> Result<()> {
        let ast = self.ast;
        match &ast[node] {
            SyntaxNode::SelectExpression(select) => {
                self.bind_select_expression(node, select, correlated)
            }
            SyntaxNode::TableUnion(union) => {
                self.bind_query(union.left, correlated)?;
                self.bind_query(union.right, correlated)
            }
            SyntaxNode::Group(group) => self.bind_query(group.expression, correlated),
            _ => self.bind_node(node),
        }
    }

    fn bind_select_expression(
        &mut self,
        node: NodeId,
        select: &SelectExpression,
        correlated: bool,
    ) -> Result<()> {
        self.scopes
            .open_scope(node, NodeKind::SelectExpression, correlated)?;

        // FROM first: it registers the aliases columns resolve against.
        self.bind_optional(select.from)?;
        self.bind_optional(select.top)?;
        self.bind_all(&select.columns)?;
        self.bind_optional(select.where_clause)?;
        self.bind_all(&select.group_by)?;
        self.bind_optional(select.having)?;
        for item in &select.order_by {
            self.bind_order_item(select, *item)?;
        }
        if let Some(into) = select.into {
            self.bind_into(into, node)?;
        }

        self.scopes.close_scope()?;
        Ok(())
    }

    /// ORDER BY may name a projection alias of its own select.
    fn bind_order_item(&mut self, select: &SelectExpression, item: NodeId) -> Result<()> {
        let ast = self.ast;
        if let SyntaxNode::OrderItem(order) = &ast[item] {
            if let SyntaxNode::ColumnReference(column) = &ast[order.expression] {
                if !column.identifier.contains('.') {
                    let projected = select.columns.iter().copied().find(|c| {
                        matches!(&ast[*c], SyntaxNode::ColumnExpression(e)
                            if e.alias.as_deref().is_some_and(|a| names_equal(a, &column.identifier)))
                    });
                    if let Some(projected) = projected {
                        self.bindings
                            .insert(order.expression, Binding::Column(projected));
                        return Ok(());
                    }
                }
            }
        }
        self.bind_node(item)
    }

    /// Registers a `#temp` or `@table` target in the scope enclosing the
    /// statement, so later statements of the script see it.
    fn bind_into(&mut self, into: NodeId, source: NodeId) -> Result<()> {
        let SyntaxNode::Into(clause) = &self.ast[into] else {
            return Err(structure(into, "expected INTO clause"));
        };

        let binding = if clause.is_variable() {
            TableBinding::TableVariable {
                name: clause.target.clone(),
                source,
            }
        } else {
            TableBinding::TemporaryTable {
                name: clause.target.clone(),
                source,
            }
        };

        let owner = self
            .scopes
            .ancestor(NodeKind::Consume)
            .or_else(|| self.scopes.ancestor_where(NodeKind::is_statement));
        let target = owner
            .and_then(|scope| self.scopes.scope(scope).logical_parent())
            .or(owner)
            .or(self.scopes.current())
            .ok_or_else(|| structure(into, "INTO outside of any scope"))?;

        trace!(target = %clause.target, scope = target.index(), "register INTO target");
        self.scopes.add_table_to(target, &clause.target, binding.clone());
        self.bindings.insert(into, Binding::Table(binding));
        Ok(())
    }

    fn bind_common_table(&mut self, node: NodeId, common_table: &CommonTable) -> Result<()> {
        // Registered before its body so recursive references resolve.
        let binding = TableBinding::CommonTable(node);
        self.scopes.add_table(&common_table.name, binding.clone())?;
        self.bindings.insert(node, Binding::Table(binding));
        self.bind_query(common_table.expression, false)
    }

    fn bind_table_reference(&mut self, node: NodeId, table: &TableReference) -> Result<()> {
        match self.resolve_table(&table.identifier)? {
            Some(binding) => {
                trace!(table = %table.identifier, alias = table.alias_or_name(), "bound table");
                self.bindings.insert(node, Binding::Table(binding.clone()));
                self.scopes
                    .add_alias(table.alias_or_name(), AliasTarget { node, binding })
            }
            None => {
                self.report(TokenKind::Table, &table.identifier);
                Ok(())
            }
        }
    }

    /// Resolves a table name: script-defined tables first, then table-valued
    /// variables, then the schema.
    fn resolve_table(&self, name: &str) -> Result<Option<TableBinding>> {
        if let Some(binding) = self.scopes.table_binding(name) {
            return Ok(Some(binding.clone()));
        }
        if let Some(VariableBinding::Record(definition)) = self.scopes.variable_binding(name) {
            return Ok(Some(TableBinding::Parameter {
                name: name.to_string(),
                definition: Arc::clone(definition),
            }));
        }
        let definition = self
            .schema
            .get_metadata_object(name)
            .map_err(schema_error)?;
        Ok(definition.map(TableBinding::Entity))
    }

    fn bind_column(&mut self, node: NodeId, column: &ColumnReference) -> Result<()> {
        // Three-part names may be enumeration members.
        if column.identifier.matches('.').count() >= 2 {
            if let Some(member) = self
                .schema
                .try_get_enum_value(&column.identifier)
                .map_err(schema_error)?
            {
                trace!(identifier = %column.identifier, "bound enumeration value");
                self.bindings.insert(node, Binding::EnumValue(member));
                return Ok(());
            }
        }

        let (qualifier, name) = column.split();
        match self.resolve_column(qualifier, name) {
            Some(binding) => {
                trace!(identifier = %column.identifier, "bound column");
                self.scopes.add_column(&column.identifier, binding.clone())?;
                self.bindings.insert(node, binding);
            }
            None => self.report(TokenKind::Column, &column.identifier),
        }
        Ok(())
    }

    fn resolve_column(&self, qualifier: &str, name: &str) -> Option<Binding> {
        let ambiguous = self
            .scopes
            .current()
            .is_some_and(|id| self.scopes.scope(id).alias_count() > 1);

        if ambiguous && qualifier.is_empty() {
            let scope = self.scopes.scope(self.scopes.current()?);
            let mut matches = scope
                .aliases()
                .filter_map(|(_, target)| self.resolve_in_table(&target.binding, name));
            let first = matches.next();
            if self.config.strict_pseudo_tables && matches.next().is_some() {
                return None;
            }
            return first;
        }

        if ambiguous && is_pseudo_table(qualifier) && self.config.strict_pseudo_tables {
            return None;
        }

        let target = self.scopes.try_get_table_by_alias(qualifier)?;
        self.resolve_in_table(&target.binding, name)
    }

    /// Resolves a column name against a table source.
    fn resolve_in_table(&self, table: &TableBinding, name: &str) -> Option<Binding> {
        if let Some(definition) = table.definition() {
            return definition.property_index(name).map(|index| Binding::Property {
                entity: Arc::clone(definition),
                index,
            });
        }
        let source = table.source_node()?;
        self.find_projected_column(source, name).map(Binding::Column)
    }

    /// Finds the projected column named `name`; unions resolve against their
    /// first arm.
    fn find_projected_column(&self, node: NodeId, name: &str) -> Option<NodeId> {
        match &self.ast[node] {
            SyntaxNode::SelectExpression(select) => select
                .columns
                .iter()
                .copied()
                .find(|column| self.projects_name(*column, name)),
            SyntaxNode::Output(output) => output
                .columns
                .iter()
                .copied()
                .find(|column| self.projects_name(*column, name)),
            SyntaxNode::TableUnion(union) => self.find_projected_column(union.left, name),
            SyntaxNode::Group(group) => self.find_projected_column(group.expression, name),
            SyntaxNode::CommonTable(common_table) => {
                self.find_projected_column(common_table.expression, name)
            }
            _ => None,
        }
    }

    fn projects_name(&self, column: NodeId, name: &str) -> bool {
        let SyntaxNode::ColumnExpression(expression) = &self.ast[column] else {
            return false;
        };
        if let Some(alias) = &expression.alias {
            return names_equal(alias, name);
        }
        match &self.ast[expression.expression] {
            SyntaxNode::ColumnReference(reference) => names_equal(reference.column_name(), name),
            SyntaxNode::VariableReference(variable) => {
                names_equal(variable.name.trim_start_matches('@'), name)
            }
            _ => false,
        }
    }

    fn bind_variable(&mut self, node: NodeId, variable: &VariableReference) {
        match self.scopes.variable_binding(&variable.name) {
            Some(binding) => {
                self.bindings.insert(node, Binding::Variable(binding.clone()));
            }
            None => self.report(TokenKind::Variable, &variable.name),
        }
    }

    fn bind_declare(&mut self, declare: &DeclareStatement) -> Result<()> {
        if let Some(initializer) = declare.initializer {
            self.bind_query(initializer, false)?;
        }

        let type_node = declare.type_identifier;
        let SyntaxNode::TypeIdentifier(type_identifier) = &self.ast[type_node] else {
            return Err(structure(type_node, "DECLARE without a type identifier"));
        };

        let binding = match UnionTag::from_type_name(&type_identifier.name) {
            Some(UnionTag::Entity) => {
                Some(VariableBinding::Entity(self.narrow_entity(declare.initializer)))
            }
            Some(tag) => Some(VariableBinding::Primitive(tag.into())),
            None => self
                .schema
                .get_metadata_object(&type_identifier.name)
                .map_err(schema_error)?
                .map(VariableBinding::Record),
        };

        match binding {
            Some(binding) => {
                trace!(variable = %declare.name, ?binding, "declared variable");
                self.bindings.insert(type_node, Binding::Type(binding.clone()));
                self.scopes.add_variable(&declare.name, binding)
            }
            None => {
                self.report(TokenKind::Type, &type_identifier.name);
                Ok(())
            }
        }
    }

    /// Captures the concrete reference type of an `entity` initializer so the
    /// variable does not need a runtime discriminator.
    fn narrow_entity(&self, initializer: Option<NodeId>) -> Entity {
        let Some(initializer) = initializer else {
            return Entity::UNDEFINED;
        };
        let inferencer = TypeInferencer::new(self.ast, &self.bindings);
        let inferred = match &self.ast[initializer] {
            SyntaxNode::SelectExpression(select) if select.columns.len() == 1 => {
                inferencer.try_infer(select.columns[0])
            }
            SyntaxNode::SelectExpression(_) => None,
            _ => inferencer.try_infer(initializer),
        };
        inferred
            .and_then(|inferred| inferred.union_type.single_reference())
            .map_or(Entity::UNDEFINED, Entity::of_type)
    }

    fn bind_insert(&mut self, node: NodeId, insert: &InsertStatement) -> Result<()> {
        debug!(%node, "binding INSERT");
        self.scopes.open_scope(node, NodeKind::Insert, false)?;
        self.bind_optional(insert.common_tables)?;
        self.bind_node(insert.target)?;
        self.bind_query(insert.source, false)?;
        self.bind_optional(insert.output)?;
        self.scopes.close_scope()?;
        Ok(())
    }

    fn bind_update(&mut self, node: NodeId, update: &UpdateStatement) -> Result<()> {
        debug!(%node, "binding UPDATE");
        self.scopes.open_scope(node, NodeKind::Update, false)?;
        self.bind_optional(update.common_tables)?;
        self.bind_node(update.target)?;
        self.bind_optional(update.from)?;
        let target = self.target_binding(update.target);
        for set in &update.set {
            self.bind_set(*set, target.as_ref())?;
        }
        self.bind_optional(update.where_clause)?;
        self.bind_optional(update.output)?;
        self.scopes.close_scope()?;
        Ok(())
    }

    fn bind_delete(&mut self, node: NodeId, delete: &DeleteStatement) -> Result<()> {
        debug!(%node, "binding DELETE");
        self.scopes.open_scope(node, NodeKind::Delete, false)?;
        self.bind_optional(delete.common_tables)?;
        self.bind_node(delete.target)?;
        self.bind_optional(delete.where_clause)?;
        self.bind_optional(delete.output)?;
        self.scopes.close_scope()?;
        Ok(())
    }

    fn bind_upsert(&mut self, node: NodeId, upsert: &UpsertStatement) -> Result<()> {
        debug!(%node, "binding UPSERT");
        self.scopes.open_scope(node, NodeKind::Upsert, false)?;
        self.bind_optional(upsert.common_tables)?;
        self.bind_node(upsert.target)?;
        self.bind_node(upsert.source)?;
        self.bind_optional(upsert.where_clause)?;
        let target = self.target_binding(upsert.target);
        for set in &upsert.set {
            self.bind_set(*set, target.as_ref())?;
        }
        self.scopes.close_scope()?;
        Ok(())
    }

    fn target_binding(&self, target: NodeId) -> Option<TableBinding> {
        self.bindings.get(target).and_then(Binding::as_table).cloned()
    }

    /// Binds `column = initializer`; the column always names a property of the
    /// statement's target table.
    fn bind_set(&mut self, set: NodeId, target: Option<&TableBinding>) -> Result<()> {
        let ast = self.ast;
        let SyntaxNode::SetExpression(assignment) = &ast[set] else {
            return Err(structure(set, "expected SET expression"));
        };
        let SyntaxNode::ColumnReference(column) = &ast[assignment.column] else {
            return Err(structure(assignment.column, "SET target is not a column"));
        };

        match target.and_then(|t| self.resolve_in_table(t, column.column_name())) {
            Some(binding) => self.bindings.insert(assignment.column, binding),
            None => self.report(TokenKind::Column, &column.identifier),
        }
        self.bind_node(assignment.initializer)
    }

    fn bind_output(&mut self, node: NodeId, output: &OutputClause) -> Result<()> {
        self.bind_all(&output.columns)?;
        if let Some(into) = output.into {
            self.bind_into(into, node)?;
        }
        Ok(())
    }

    fn report(&mut self, kind: TokenKind, identifier: &str) {
        let error = BindError::unresolved(kind, identifier);
        debug!(%error, "unresolved name");
        self.diagnostics.push(error);
    }
}

fn structure(node: NodeId, message: &str) -> UnionSqlError {
    UnionSqlError::Structure(format!("{message} (node {node})"))
}

/// Collapses any provider failure into a schema error.
fn schema_error(err: UnionSqlError) -> UnionSqlError {
    match err {
        UnionSqlError::Schema(message) => UnionSqlError::Schema(message),
        other => UnionSqlError::Schema(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, EntityDefinition, PropertyDefinition};
    use crate::parser::ast::{ComparisonOp, LiteralToken};
    use crate::types::UnionType;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .add_entity(
                EntityDefinition::new(
                    42,
                    "Справочник.Товар",
                    "_Reference42",
                    vec![
                        PropertyDefinition::new("Ссылка", "_ID", UnionType::entity(42)),
                        PropertyDefinition::new("Код", "_Code", UnionTag::String.into()),
                        PropertyDefinition::new("Имя", "_Description", UnionTag::String.into()),
                    ],
                )
                .unwrap(),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_unbound_table_reports_once() {
        let catalog = catalog();
        let mut ast = Ast::new();
        let column = ast.projection("Код", None);
        let table = ast.table("Справочник.Нет", None);
        let select = ast.select(SelectExpression::new(vec![column]).from(table));
        let statement = ast.select_statement(None, select);
        let script = ast.script(vec![statement]);

        let bound = bind(&ast, script, &catalog).unwrap();
        let messages = bound.messages();
        assert_eq!(messages[0], "Failed to bind [table: Справочник.Нет]");
        assert_eq!(messages[1], "Failed to bind [column: Код]");
        assert!(bound.binding(table).is_none());
    }

    #[test]
    fn test_order_by_projection_alias() {
        let catalog = catalog();
        let mut ast = Ast::new();
        let column = ast.projection("Имя", Some("Название"));
        let table = ast.table("Справочник.Товар", None);
        let key = ast.column("Название");
        let order = ast.order_item(key, false);
        let select = ast.select(
            SelectExpression::new(vec![column])
                .from(table)
                .order_by(vec![order]),
        );
        let statement = ast.select_statement(None, select);
        let script = ast.script(vec![statement]);

        let bound = bind(&ast, script, &catalog).unwrap();
        assert!(bound.is_success(), "{:?}", bound.messages());
        assert!(matches!(bound.binding(key), Some(Binding::Column(c)) if *c == column));
    }

    #[test]
    fn test_depth_limit_is_structural() {
        let catalog = catalog();
        let mut ast = Ast::new();
        let mut expression = ast.literal(LiteralToken::Number, "1");
        for _ in 0..10 {
            expression = ast.group(expression);
        }
        let other = ast.literal(LiteralToken::Number, "2");
        let comparison = ast.comparison(ComparisonOp::Eq, expression, other);
        let column = ast.column_as(comparison, None);
        let select = ast.select(SelectExpression::new(vec![column]));
        let statement = ast.select_statement(None, select);
        let script = ast.script(vec![statement]);

        let config = BinderConfig::new().with_max_depth(5);
        let result = Binder::with_config(&ast, &catalog, config).bind(script);
        assert!(matches!(result, Err(UnionSqlError::Structure(_))));
    }

    #[test]
    fn test_into_result() {
        let catalog = catalog();
        let mut ast = Ast::new();
        let variable = ast.variable("@нет");
        let column = ast.column_as(variable, None);
        let select = ast.select(SelectExpression::new(vec![column]));
        let statement = ast.select_statement(None, select);
        let script = ast.script(vec![statement]);

        let err = bind(&ast, script, &catalog).unwrap().into_result().unwrap_err();
        assert!(err.to_string().contains("[variable: @нет]"));
    }
}
