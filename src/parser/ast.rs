//! Abstract Syntax Tree definitions for scripts.
//!
//! The tree is stored in an [`Ast`] arena and nodes refer to their children by
//! [`NodeId`]. Semantic analysis never mutates the tree; results are kept in
//! side tables keyed by `NodeId`.

use std::fmt;
use std::ops::Index;

/// Index of a node inside its [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the arena index of this node.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena holding every node of a parsed script.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<SyntaxNode>,
}

impl Index<NodeId> for Ast {
    type Output = SyntaxNode;

    fn index(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }
}

impl Ast {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Ast { nodes: Vec::new() }
    }

    /// Appends a node and returns its id.
    pub fn push(&mut self, node: SyntaxNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Returns the node with the given id, if it belongs to this tree.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id.index())
    }

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self[id].kind()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ---------------------------------------------------------------------
    // Construction helpers
    // ---------------------------------------------------------------------

    /// Adds a script node.
    pub fn script(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.push(SyntaxNode::Script(Script { statements }))
    }

    /// Adds a `DECLARE` statement with its type identifier.
    pub fn declare(&mut self, name: &str, type_name: &str, initializer: Option<NodeId>) -> NodeId {
        let type_identifier = self.push(SyntaxNode::TypeIdentifier(TypeIdentifier {
            name: type_name.to_string(),
        }));
        self.push(SyntaxNode::Declare(DeclareStatement {
            name: name.to_string(),
            type_identifier,
            initializer,
        }))
    }

    /// Adds a `SELECT` statement.
    pub fn select_statement(&mut self, common_tables: Option<NodeId>, expression: NodeId) -> NodeId {
        self.push(SyntaxNode::Select(SelectStatement {
            common_tables,
            expression,
        }))
    }

    /// Adds a select expression.
    pub fn select(&mut self, select: SelectExpression) -> NodeId {
        self.push(SyntaxNode::SelectExpression(select))
    }

    /// Adds a `WITH` clause.
    pub fn common_tables(&mut self, tables: Vec<NodeId>) -> NodeId {
        self.push(SyntaxNode::CommonTables(CommonTables { tables }))
    }

    /// Adds a common table expression.
    pub fn common_table(&mut self, name: &str, expression: NodeId) -> NodeId {
        self.push(SyntaxNode::CommonTable(CommonTable {
            name: name.to_string(),
            expression,
        }))
    }

    /// Adds a `UNION` of two queries.
    pub fn union(&mut self, left: NodeId, right: NodeId, all: bool) -> NodeId {
        self.push(SyntaxNode::TableUnion(TableUnion { left, right, all }))
    }

    /// Adds a table reference.
    pub fn table(&mut self, identifier: &str, alias: Option<&str>) -> NodeId {
        self.push(SyntaxNode::TableReference(TableReference {
            identifier: identifier.to_string(),
            alias: alias.map(str::to_string),
        }))
    }

    /// Adds a derived table.
    pub fn derived_table(&mut self, expression: NodeId, alias: &str) -> NodeId {
        self.push(SyntaxNode::TableExpression(TableExpression {
            expression,
            alias: alias.to_string(),
        }))
    }

    /// Adds a join of two table sources.
    pub fn join(&mut self, join_type: JoinType, left: NodeId, right: NodeId, on: Option<NodeId>) -> NodeId {
        self.push(SyntaxNode::TableJoin(TableJoin {
            join_type,
            left,
            right,
            on,
        }))
    }

    /// Adds a projected column.
    pub fn column_as(&mut self, expression: NodeId, alias: Option<&str>) -> NodeId {
        self.push(SyntaxNode::ColumnExpression(ColumnExpression {
            expression,
            alias: alias.map(str::to_string),
        }))
    }

    /// Adds a column reference.
    pub fn column(&mut self, identifier: &str) -> NodeId {
        self.push(SyntaxNode::ColumnReference(ColumnReference {
            identifier: identifier.to_string(),
        }))
    }

    /// Adds a projected column reference, e.g. `a.Имя AS Name`.
    pub fn projection(&mut self, identifier: &str, alias: Option<&str>) -> NodeId {
        let column = self.column(identifier);
        self.column_as(column, alias)
    }

    /// Adds a variable reference.
    pub fn variable(&mut self, name: &str) -> NodeId {
        self.push(SyntaxNode::VariableReference(VariableReference {
            name: name.to_string(),
        }))
    }

    /// Adds a literal.
    pub fn literal(&mut self, token: LiteralToken, lexeme: &str) -> NodeId {
        self.push(SyntaxNode::ScalarLiteral(ScalarLiteral {
            token,
            lexeme: lexeme.to_string(),
        }))
    }

    /// Adds a comparison.
    pub fn comparison(&mut self, op: ComparisonOp, left: NodeId, right: NodeId) -> NodeId {
        self.push(SyntaxNode::Comparison(ComparisonOperator { op, left, right }))
    }

    /// Adds an arithmetic or concatenation operator.
    pub fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.push(SyntaxNode::Binary(BinaryOperator { op, left, right }))
    }

    /// Adds an `AND`/`OR` operator.
    pub fn logical(&mut self, op: LogicalOp, left: NodeId, right: NodeId) -> NodeId {
        self.push(SyntaxNode::Logical(LogicalOperator { op, left, right }))
    }

    /// Adds a unary operator.
    pub fn unary(&mut self, op: UnaryOp, expression: NodeId) -> NodeId {
        self.push(SyntaxNode::Unary(UnaryOperator { op, expression }))
    }

    /// Adds a parenthesized expression.
    pub fn group(&mut self, expression: NodeId) -> NodeId {
        self.push(SyntaxNode::Group(GroupOperator { expression }))
    }

    /// Adds a `CASE` expression from `(condition, then)` pairs.
    pub fn case(&mut self, when: Vec<(NodeId, NodeId)>, otherwise: Option<NodeId>) -> NodeId {
        let when = when
            .into_iter()
            .map(|(condition, then)| self.push(SyntaxNode::When(WhenClause { condition, then })))
            .collect();
        self.push(SyntaxNode::Case(CaseExpression { when, otherwise }))
    }

    /// Adds a function call.
    pub fn function(&mut self, name: &str, arguments: Vec<NodeId>) -> NodeId {
        self.push(SyntaxNode::FunctionCall(FunctionExpression {
            name: name.to_string(),
            arguments,
            over: None,
        }))
    }

    /// Adds an `EXISTS` predicate.
    pub fn exists(&mut self, query: NodeId) -> NodeId {
        self.push(SyntaxNode::Exists(ExistsExpression { query }))
    }

    /// Adds a `SET` assignment.
    pub fn set(&mut self, column: &str, initializer: NodeId) -> NodeId {
        let column = self.column(column);
        self.push(SyntaxNode::SetExpression(SetExpression {
            column,
            initializer,
        }))
    }

    /// Adds an `INTO` target.
    pub fn into_target(&mut self, target: &str) -> NodeId {
        self.push(SyntaxNode::Into(IntoClause {
            target: target.to_string(),
        }))
    }

    /// Adds an `ORDER BY` item.
    pub fn order_item(&mut self, expression: NodeId, descending: bool) -> NodeId {
        self.push(SyntaxNode::OrderItem(OrderItem {
            expression,
            descending,
        }))
    }
}

/// A node of the syntax tree.
///
/// The set of variants is closed: every analysis pass matches on it
/// exhaustively, so a new variant cannot be silently skipped.
#[derive(Debug, Clone)]
pub enum SyntaxNode {
    Script(Script),
    Declare(DeclareStatement),
    TypeIdentifier(TypeIdentifier),
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Upsert(UpsertStatement),
    Consume(ConsumeStatement),
    CommonTables(CommonTables),
    CommonTable(CommonTable),
    SelectExpression(SelectExpression),
    TableUnion(TableUnion),
    TableReference(TableReference),
    TableExpression(TableExpression),
    TableJoin(TableJoin),
    ColumnExpression(ColumnExpression),
    ColumnReference(ColumnReference),
    VariableReference(VariableReference),
    ScalarLiteral(ScalarLiteral),
    Unary(UnaryOperator),
    Binary(BinaryOperator),
    Comparison(ComparisonOperator),
    Logical(LogicalOperator),
    Group(GroupOperator),
    Case(CaseExpression),
    When(WhenClause),
    FunctionCall(FunctionExpression),
    Over(OverClause),
    OrderItem(OrderItem),
    SetExpression(SetExpression),
    Output(OutputClause),
    Into(IntoClause),
    Exists(ExistsExpression),
    InList(InExpression),
}

impl SyntaxNode {
    /// Returns the payload-free kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            SyntaxNode::Script(_) => NodeKind::Script,
            SyntaxNode::Declare(_) => NodeKind::Declare,
            SyntaxNode::TypeIdentifier(_) => NodeKind::TypeIdentifier,
            SyntaxNode::Select(_) => NodeKind::Select,
            SyntaxNode::Insert(_) => NodeKind::Insert,
            SyntaxNode::Update(_) => NodeKind::Update,
            SyntaxNode::Delete(_) => NodeKind::Delete,
            SyntaxNode::Upsert(_) => NodeKind::Upsert,
            SyntaxNode::Consume(_) => NodeKind::Consume,
            SyntaxNode::CommonTables(_) => NodeKind::CommonTables,
            SyntaxNode::CommonTable(_) => NodeKind::CommonTable,
            SyntaxNode::SelectExpression(_) => NodeKind::SelectExpression,
            SyntaxNode::TableUnion(_) => NodeKind::TableUnion,
            SyntaxNode::TableReference(_) => NodeKind::TableReference,
            SyntaxNode::TableExpression(_) => NodeKind::TableExpression,
            SyntaxNode::TableJoin(_) => NodeKind::TableJoin,
            SyntaxNode::ColumnExpression(_) => NodeKind::ColumnExpression,
            SyntaxNode::ColumnReference(_) => NodeKind::ColumnReference,
            SyntaxNode::VariableReference(_) => NodeKind::VariableReference,
            SyntaxNode::ScalarLiteral(_) => NodeKind::ScalarLiteral,
            SyntaxNode::Unary(_) => NodeKind::Unary,
            SyntaxNode::Binary(_) => NodeKind::Binary,
            SyntaxNode::Comparison(_) => NodeKind::Comparison,
            SyntaxNode::Logical(_) => NodeKind::Logical,
            SyntaxNode::Group(_) => NodeKind::Group,
            SyntaxNode::Case(_) => NodeKind::Case,
            SyntaxNode::When(_) => NodeKind::When,
            SyntaxNode::FunctionCall(_) => NodeKind::FunctionCall,
            SyntaxNode::Over(_) => NodeKind::Over,
            SyntaxNode::OrderItem(_) => NodeKind::OrderItem,
            SyntaxNode::SetExpression(_) => NodeKind::SetExpression,
            SyntaxNode::Output(_) => NodeKind::Output,
            SyntaxNode::Into(_) => NodeKind::Into,
            SyntaxNode::Exists(_) => NodeKind::Exists,
            SyntaxNode::InList(_) => NodeKind::InList,
        }
    }
}

/// Discriminant of [`SyntaxNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Script,
    Declare,
    TypeIdentifier,
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
    Consume,
    CommonTables,
    CommonTable,
    SelectExpression,
    TableUnion,
    TableReference,
    TableExpression,
    TableJoin,
    ColumnExpression,
    ColumnReference,
    VariableReference,
    ScalarLiteral,
    Unary,
    Binary,
    Comparison,
    Logical,
    Group,
    Case,
    When,
    FunctionCall,
    Over,
    OrderItem,
    SetExpression,
    Output,
    Into,
    Exists,
    InList,
}

impl NodeKind {
    /// Returns true for data statements that open their own scope.
    #[must_use]
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::Select
                | NodeKind::Insert
                | NodeKind::Update
                | NodeKind::Delete
                | NodeKind::Upsert
                | NodeKind::Consume
        )
    }
}

/// Sequence of statements.
#[derive(Debug, Clone)]
pub struct Script {
    pub statements: Vec<NodeId>,
}

/// `DECLARE @name type [= initializer]`.
#[derive(Debug, Clone)]
pub struct DeclareStatement {
    /// Variable name including the `@` prefix.
    pub name: String,
    /// A [`TypeIdentifier`] node.
    pub type_identifier: NodeId,
    pub initializer: Option<NodeId>,
}

/// Type name of a declaration: a primitive token or a schema record type.
#[derive(Debug, Clone)]
pub struct TypeIdentifier {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub common_tables: Option<NodeId>,
    /// A select expression or table union.
    pub expression: NodeId,
}

#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub common_tables: Option<NodeId>,
    /// A [`TableReference`] node.
    pub target: NodeId,
    /// A select expression or table union.
    pub source: NodeId,
    pub output: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub common_tables: Option<NodeId>,
    /// A [`TableReference`] node.
    pub target: NodeId,
    /// [`SetExpression`] nodes.
    pub set: Vec<NodeId>,
    pub from: Option<NodeId>,
    pub where_clause: Option<NodeId>,
    pub output: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub common_tables: Option<NodeId>,
    pub target: NodeId,
    pub where_clause: Option<NodeId>,
    pub output: Option<NodeId>,
}

/// Insert-or-update of target rows matched against a source.
#[derive(Debug, Clone)]
pub struct UpsertStatement {
    pub common_tables: Option<NodeId>,
    pub target: NodeId,
    /// Table source providing the rows.
    pub source: NodeId,
    /// Match condition between target and source.
    pub where_clause: Option<NodeId>,
    /// Assignments applied to matched rows.
    pub set: Vec<NodeId>,
    /// Insert only, never update matched rows.
    pub ignore_update: bool,
}

/// Destructive read from a queue table.
#[derive(Debug, Clone)]
pub struct ConsumeStatement {
    /// Select expression reading the queue.
    pub expression: NodeId,
}

/// `WITH` clause.
#[derive(Debug, Clone)]
pub struct CommonTables {
    /// [`CommonTable`] nodes in declaration order.
    pub tables: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct CommonTable {
    pub name: String,
    pub expression: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct SelectExpression {
    pub distinct: bool,
    pub top: Option<NodeId>,
    /// [`ColumnExpression`] nodes in projection order.
    pub columns: Vec<NodeId>,
    /// An [`IntoClause`] node.
    pub into: Option<NodeId>,
    pub from: Option<NodeId>,
    pub where_clause: Option<NodeId>,
    pub group_by: Vec<NodeId>,
    pub having: Option<NodeId>,
    /// [`OrderItem`] nodes.
    pub order_by: Vec<NodeId>,
}

impl SelectExpression {
    /// Creates a select expression projecting the given columns.
    #[must_use]
    pub fn new(columns: Vec<NodeId>) -> Self {
        SelectExpression {
            columns,
            ..SelectExpression::default()
        }
    }

    /// Sets the FROM clause.
    #[must_use]
    pub fn from(mut self, from: NodeId) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn filter(mut self, where_clause: NodeId) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    /// Sets the INTO clause.
    #[must_use]
    pub fn into_target(mut self, into: NodeId) -> Self {
        self.into = Some(into);
        self
    }

    /// Sets the ORDER BY clause.
    #[must_use]
    pub fn order_by(mut self, order_by: Vec<NodeId>) -> Self {
        self.order_by = order_by;
        self
    }

    /// Sets the GROUP BY clause.
    #[must_use]
    pub fn group_by(mut self, group_by: Vec<NodeId>) -> Self {
        self.group_by = group_by;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TableUnion {
    pub left: NodeId,
    pub right: NodeId,
    pub all: bool,
}

/// Named table source: schema object, CTE, temporary table or table variable.
#[derive(Debug, Clone)]
pub struct TableReference {
    pub identifier: String,
    pub alias: Option<String>,
}

impl TableReference {
    /// Returns the name columns use to qualify this source.
    #[must_use]
    pub fn alias_or_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.identifier)
    }
}

/// Derived table: `(SELECT ...) AS alias`.
#[derive(Debug, Clone)]
pub struct TableExpression {
    pub expression: NodeId,
    pub alias: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone)]
pub struct TableJoin {
    pub join_type: JoinType,
    pub left: NodeId,
    pub right: NodeId,
    pub on: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ColumnExpression {
    pub expression: NodeId,
    pub alias: Option<String>,
}

/// Possibly qualified column name, e.g. `Код`, `a.Код`, `Справочник.Товар.Код`.
#[derive(Debug, Clone)]
pub struct ColumnReference {
    pub identifier: String,
}

impl ColumnReference {
    /// Splits the identifier into `(qualifier, column)`; the qualifier is
    /// empty for bare column names.
    #[must_use]
    pub fn split(&self) -> (&str, &str) {
        self.identifier
            .rsplit_once('.')
            .unwrap_or(("", self.identifier.as_str()))
    }

    /// Returns the column part of the identifier.
    #[must_use]
    pub fn column_name(&self) -> &str {
        self.split().1
    }
}

#[derive(Debug, Clone)]
pub struct VariableReference {
    /// Variable name including the `@` prefix.
    pub name: String,
}

/// Literal token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralToken {
    Boolean,
    Number,
    DateTime,
    String,
    Binary,
    Uuid,
    /// Reference literal in `{code:uuid}` form.
    Entity,
    Null,
}

#[derive(Debug, Clone)]
pub struct ScalarLiteral {
    pub token: LiteralToken,
    pub lexeme: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Not,
}

#[derive(Debug, Clone)]
pub struct UnaryOperator {
    pub op: UnaryOp,
    pub expression: NodeId,
}

/// Arithmetic and concatenation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone)]
pub struct BinaryOperator {
    pub op: BinaryOp,
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone)]
pub struct ComparisonOperator {
    pub op: ComparisonOp,
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct LogicalOperator {
    pub op: LogicalOp,
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone)]
pub struct GroupOperator {
    pub expression: NodeId,
}

#[derive(Debug, Clone)]
pub struct CaseExpression {
    /// [`WhenClause`] nodes.
    pub when: Vec<NodeId>,
    pub otherwise: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct WhenClause {
    pub condition: NodeId,
    pub then: NodeId,
}

#[derive(Debug, Clone)]
pub struct FunctionExpression {
    pub name: String,
    pub arguments: Vec<NodeId>,
    /// An [`OverClause`] node for window functions.
    pub over: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct OverClause {
    pub partition: Vec<NodeId>,
    /// [`OrderItem`] nodes.
    pub order: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expression: NodeId,
    pub descending: bool,
}

/// `column = initializer` of an UPDATE or UPSERT.
#[derive(Debug, Clone)]
pub struct SetExpression {
    /// A [`ColumnReference`] of the target table.
    pub column: NodeId,
    pub initializer: NodeId,
}

/// `OUTPUT columns [INTO target]` of a data modification statement.
#[derive(Debug, Clone)]
pub struct OutputClause {
    /// [`ColumnExpression`] nodes.
    pub columns: Vec<NodeId>,
    pub into: Option<NodeId>,
}

/// `INTO #temp` or `INTO @table`.
#[derive(Debug, Clone)]
pub struct IntoClause {
    pub target: String,
}

impl IntoClause {
    /// Returns true for a table variable target.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.target.starts_with('@')
    }
}

#[derive(Debug, Clone)]
pub struct ExistsExpression {
    pub query: NodeId,
}

#[derive(Debug, Clone)]
pub struct InExpression {
    pub expression: NodeId,
    /// Literal list or a single subquery.
    pub values: Vec<NodeId>,
    pub negated: bool,
}
