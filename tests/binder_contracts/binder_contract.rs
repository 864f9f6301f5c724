//! Contract tests for the Binder module.
//!
//! These tests verify the semantic analysis contracts:
//! - Unresolved names become diagnostics, never errors
//! - Aliases of non-correlated subqueries stay local
//! - Provider failures collapse into one diagnostic
//! - Structural violations are returned as errors

use std::sync::Arc;

use unionsql::binder::{bind, Binder, BinderConfig, Binding, ScopeTree, VariableBinding};
use unionsql::catalog::{Catalog, EntityDefinition, EnumMember, PropertyDefinition, SchemaProvider};
use unionsql::error::{BindError, Result, TokenKind, UnionSqlError};
use unionsql::parser::ast::{
    Ast, ComparisonOp, DeleteStatement, JoinType, LiteralToken, NodeKind, OutputClause,
    SelectExpression, SyntaxNode, UpdateStatement,
};
use unionsql::types::{UnionTag, UnionType};
use uuid::Uuid;

/// Creates a test catalog with a product catalog and a status enumeration.
fn create_test_catalog() -> Catalog {
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
        .add_enum(
            "Перечисление.Статус",
            60,
            &[("Новый", Uuid::new_v4()), ("Закрыт", Uuid::new_v4())],
        )
        .unwrap();
    catalog
}

/// Wraps a select expression into a one-statement script.
fn script_of(ast: &mut Ast, select: SelectExpression) -> unionsql::parser::NodeId {
    let select = ast.select(select);
    let statement = ast.select_statement(None, select);
    ast.script(vec![statement])
}

// -------------------------------------------------------------------------
// Diagnostics
// -------------------------------------------------------------------------

#[test]
fn test_unknown_alias_produces_one_diagnostic() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let reference = ast.column("x.Имя");
    let column = ast.column_as(reference, None);
    let table = ast.table("Справочник.Товар", Some("a"));
    let script = script_of(&mut ast, SelectExpression::new(vec![column]).from(table));

    let bound = bind(&ast, script, &catalog).unwrap();
    assert_eq!(bound.messages(), vec!["Failed to bind [column: x.Имя]".to_string()]);
    assert!(bound.binding(reference).is_none());
}

#[test]
fn test_all_unresolved_names_reported_in_one_pass() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let first = ast.projection("a.Нет", None);
    let variable = ast.variable("@нет");
    let second = ast.column_as(variable, None);
    let table = ast.table("Справочник.Товар", Some("a"));
    let missing = ast.table("Справочник.Нет", Some("b"));
    let join = ast.join(JoinType::Cross, table, missing, None);
    let script = script_of(&mut ast, SelectExpression::new(vec![first, second]).from(join));

    let bound = bind(&ast, script, &catalog).unwrap();
    assert_eq!(
        bound.diagnostics(),
        &[
            BindError::unresolved(TokenKind::Table, "Справочник.Нет"),
            BindError::unresolved(TokenKind::Column, "a.Нет"),
            BindError::unresolved(TokenKind::Variable, "@нет"),
        ]
    );
    assert!(!bound.is_success());
}

#[test]
fn test_unknown_declared_type() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let declare = ast.declare("@x", "Нечто", None);
    let script = ast.script(vec![declare]);

    let bound = bind(&ast, script, &catalog).unwrap();
    assert_eq!(bound.messages(), vec!["Failed to bind [type: Нечто]".to_string()]);
}

// -------------------------------------------------------------------------
// Alias visibility
// -------------------------------------------------------------------------

#[test]
fn test_derived_table_alias_not_visible_outside() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();

    let inner_column = ast.projection("t.Код", None);
    let inner_table = ast.table("Справочник.Товар", Some("t"));
    let inner = ast.select(SelectExpression::new(vec![inner_column]).from(inner_table));
    let derived = ast.derived_table(inner, "d");

    let outer_column = ast.projection("d.Код", None);
    let leaked = ast.column("t.Код");
    let literal = ast.literal(LiteralToken::String, "001");
    let filter = ast.comparison(ComparisonOp::Eq, leaked, literal);
    let script = script_of(
        &mut ast,
        SelectExpression::new(vec![outer_column]).from(derived).filter(filter),
    );

    let bound = bind(&ast, script, &catalog).unwrap();
    assert_eq!(bound.messages(), vec!["Failed to bind [column: t.Код]".to_string()]);
    assert!(bound.binding(leaked).is_none());
}

#[test]
fn test_derived_table_cannot_see_sibling_alias() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();

    let outer_table = ast.table("Справочник.Товар", Some("a"));
    let inner_column = ast.projection("b.Код", None);
    let inner_table = ast.table("Справочник.Товар", Some("b"));
    let left = ast.column("b.Код");
    let right = ast.column("a.Код");
    let inner_filter = ast.comparison(ComparisonOp::Eq, left, right);
    let inner = ast.select(
        SelectExpression::new(vec![inner_column])
            .from(inner_table)
            .filter(inner_filter),
    );
    let derived = ast.derived_table(inner, "d");
    let join = ast.join(JoinType::Cross, outer_table, derived, None);
    let column = ast.projection("a.Код", None);
    let script = script_of(&mut ast, SelectExpression::new(vec![column]).from(join));

    let bound = bind(&ast, script, &catalog).unwrap();
    assert_eq!(bound.messages(), vec!["Failed to bind [column: a.Код]".to_string()]);
    assert!(bound.binding(right).is_none());
    assert!(bound.binding(left).is_some());
}

#[test]
fn test_correlated_subquery_sees_outer_alias() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();

    let inner_column = ast.projection("b.Код", None);
    let inner_table = ast.table("Справочник.Товар", Some("b"));
    let left = ast.column("b.Код");
    let right = ast.column("a.Код");
    let inner_filter = ast.comparison(ComparisonOp::Eq, left, right);
    let inner = ast.select(
        SelectExpression::new(vec![inner_column])
            .from(inner_table)
            .filter(inner_filter),
    );
    let exists = ast.exists(inner);

    let column = ast.projection("a.Имя", None);
    let table = ast.table("Справочник.Товар", Some("a"));
    let script = script_of(
        &mut ast,
        SelectExpression::new(vec![column]).from(table).filter(exists),
    );

    let bound = bind(&ast, script, &catalog).unwrap();
    assert!(bound.is_success(), "{:?}", bound.messages());
    assert!(matches!(bound.binding(right), Some(Binding::Property { index: 1, .. })));

    let scope = bound.scopes().scope_of(inner).unwrap();
    assert!(bound.scopes().scope(scope).is_correlated());
}

// -------------------------------------------------------------------------
// Scope tree
// -------------------------------------------------------------------------

#[test]
fn test_inner_variable_shadows_outer() {
    let numeric = UnionType::from(UnionTag::Numeric);
    let mut ast = Ast::new();
    let owners: Vec<_> = (0..3).map(|_| ast.column("x")).collect();

    let mut tree = ScopeTree::new();
    tree.open_scope(owners[0], NodeKind::Script, false).unwrap();
    tree.add_variable("@Цена", VariableBinding::Primitive(UnionTag::String.into()))
        .unwrap();
    tree.open_scope(owners[1], NodeKind::Select, false).unwrap();
    tree.add_variable("@Цена", VariableBinding::Primitive(numeric))
        .unwrap();

    let inner = tree.variable_binding("@цена").and_then(VariableBinding::union_type);
    assert_eq!(inner, Some(numeric));

    tree.close_scope().unwrap();
    let outer = tree.variable_binding("@Цена").and_then(VariableBinding::union_type);
    assert_eq!(outer, Some(UnionTag::String.into()));
}

// -------------------------------------------------------------------------
// Pseudo-tables
// -------------------------------------------------------------------------

fn update_with_output(ast: &mut Ast) -> (unionsql::parser::NodeId, unionsql::parser::NodeId) {
    let target = ast.table("Справочник.Товар", None);
    let from = ast.table("Справочник.Товар", Some("s"));
    let value = ast.column("s.Имя");
    let set = ast.set("Имя", value);
    let inserted = ast.column("inserted.Код");
    let output_column = ast.column_as(inserted, None);
    let output = ast.push(SyntaxNode::Output(OutputClause {
        columns: vec![output_column],
        into: None,
    }));
    let update = ast.push(SyntaxNode::Update(UpdateStatement {
        common_tables: None,
        target,
        set: vec![set],
        from: Some(from),
        where_clause: None,
        output: Some(output),
    }));
    (ast.script(vec![update]), inserted)
}

#[test]
fn test_pseudo_table_with_several_sources_is_rejected() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let (script, inserted) = update_with_output(&mut ast);

    let bound = bind(&ast, script, &catalog).unwrap();
    assert_eq!(
        bound.messages(),
        vec!["Failed to bind [column: inserted.Код]".to_string()]
    );
    assert!(bound.binding(inserted).is_none());
}

#[test]
fn test_pseudo_table_resolves_to_target_when_not_strict() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let (script, inserted) = update_with_output(&mut ast);

    let config = BinderConfig::new().with_strict_pseudo_tables(false);
    let bound = Binder::with_config(&ast, &catalog, config).bind(script).unwrap();
    assert!(bound.is_success(), "{:?}", bound.messages());
    match bound.binding(inserted) {
        Some(Binding::Property { entity, index }) => {
            assert_eq!(entity.name, "Справочник.Товар");
            assert_eq!(entity.properties[*index].name, "Код");
        }
        other => panic!("unexpected binding {other:?}"),
    }
}

#[test]
fn test_deleted_pseudo_table() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let target = ast.table("Справочник.Товар", None);
    let deleted = ast.column("deleted.Ссылка");
    let output_column = ast.column_as(deleted, None);
    let output = ast.push(SyntaxNode::Output(OutputClause {
        columns: vec![output_column],
        into: None,
    }));
    let code = ast.column("Код");
    let literal = ast.literal(LiteralToken::String, "001");
    let filter = ast.comparison(ComparisonOp::Eq, code, literal);
    let delete = ast.push(SyntaxNode::Delete(DeleteStatement {
        common_tables: None,
        target,
        where_clause: Some(filter),
        output: Some(output),
    }));
    let script = ast.script(vec![delete]);

    let bound = bind(&ast, script, &catalog).unwrap();
    assert!(bound.is_success(), "{:?}", bound.messages());
    let inferred = bound.inferencer(&ast).infer(output_column);
    assert_eq!(inferred.union_type.single_reference(), Some(42));
    assert_eq!(inferred.name.as_deref(), Some("Ссылка"));
}

// -------------------------------------------------------------------------
// Enumerations and names
// -------------------------------------------------------------------------

#[test]
fn test_enum_member_reference() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let member = ast.column("Перечисление.Статус.Закрыт");
    let column = ast.column_as(member, Some("Статус"));
    let script = script_of(&mut ast, SelectExpression::new(vec![column]));

    let bound = bind(&ast, script, &catalog).unwrap();
    assert!(bound.is_success(), "{:?}", bound.messages());
    assert!(matches!(bound.binding(member), Some(Binding::EnumValue(m)) if m.name == "Закрыт"));

    let inferred = bound.inferencer(&ast).infer(column);
    assert_eq!(inferred.union_type, UnionType::entity(60));
    assert_eq!(inferred.name.as_deref(), Some("Статус"));
}

#[test]
fn test_names_ignore_case() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let column = ast.projection("A.код", None);
    let table = ast.table("справочник.товар", Some("a"));
    let script = script_of(&mut ast, SelectExpression::new(vec![column]).from(table));

    let bound = bind(&ast, script, &catalog).unwrap();
    assert!(bound.is_success(), "{:?}", bound.messages());
}

// -------------------------------------------------------------------------
// Failures
// -------------------------------------------------------------------------

struct FailingProvider;

impl SchemaProvider for FailingProvider {
    fn get_metadata_object(&self, _name: &str) -> Result<Option<Arc<EntityDefinition>>> {
        Err(UnionSqlError::Schema("connection lost".into()))
    }

    fn try_get_enum_value(&self, _qualified_name: &str) -> Result<Option<EnumMember>> {
        Ok(None)
    }
}

#[test]
fn test_provider_failure_is_one_diagnostic() {
    let mut ast = Ast::new();
    let mut statements = Vec::new();
    for name in ["Справочник.А", "Справочник.Б"] {
        let column = ast.projection("Код", None);
        let table = ast.table(name, None);
        let select = ast.select(SelectExpression::new(vec![column]).from(table));
        statements.push(ast.select_statement(None, select));
    }
    let script = ast.script(statements);

    let bound = bind(&ast, script, &FailingProvider).unwrap();
    assert_eq!(bound.diagnostics(), &[BindError::Schema("connection lost".into())]);
    // Walk stopped in the first statement: script, SELECT and select scopes.
    assert_eq!(bound.scopes().len(), 3);
    assert!(bound.scopes().current().is_none());
}

#[test]
fn test_correlated_root_is_structural_error() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let column = ast.projection("Код", None);
    let select = ast.select(SelectExpression::new(vec![column]));

    let result = bind(&ast, select, &catalog);
    assert!(matches!(result, Err(UnionSqlError::Structure(_))));
}

#[test]
fn test_misplaced_clause_is_structural_error() {
    let catalog = create_test_catalog();
    let mut ast = Ast::new();
    let into = ast.into_target("#tmp");
    let script = ast.script(vec![into]);

    let result = bind(&ast, script, &catalog);
    assert!(matches!(result, Err(UnionSqlError::Structure(_))));
}
