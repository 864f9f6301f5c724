//! Type inference over a bound syntax tree.

use crate::parser::ast::{Ast, LiteralToken, NodeId, SyntaxNode, UnaryOp};
use crate::types::{Entity, UnionTag, UnionType};

use super::binding::{Binding, Bindings, BuiltinFunction};

/// Nesting limit guarding against cyclic column bindings.
const MAX_INFERENCE_DEPTH: usize = 256;

/// Inferred type of an expression plus the name it projects under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredType {
    pub union_type: UnionType,
    /// Column alias, column name or variable name the expression exposes.
    pub name: Option<String>,
}

impl InferredType {
    /// Creates an unnamed inferred type.
    #[must_use]
    pub fn new(union_type: UnionType) -> Self {
        InferredType {
            union_type,
            name: None,
        }
    }

    /// Creates a named inferred type.
    #[must_use]
    pub fn named(union_type: UnionType, name: impl Into<String>) -> Self {
        InferredType {
            union_type,
            name: Some(name.into()),
        }
    }

    /// The inferred type of `NULL`.
    #[must_use]
    pub fn undefined() -> Self {
        InferredType::new(UnionType::undefined())
    }

    #[must_use]
    fn with_name(mut self, name: Option<String>) -> Self {
        if name.is_some() {
            self.name = name;
        }
        self
    }
}

/// Computes [`UnionType`]s of expressions from literals, operators and the
/// bindings produced by the binder.
///
/// Inference has no side effects and can run on any node once the tree has
/// been bound.
#[derive(Debug, Clone, Copy)]
pub struct TypeInferencer<'a> {
    ast: &'a Ast,
    bindings: &'a Bindings,
}

impl<'a> TypeInferencer<'a> {
    /// Creates an inferencer over a bound tree.
    #[must_use]
    pub fn new(ast: &'a Ast, bindings: &'a Bindings) -> Self {
        TypeInferencer { ast, bindings }
    }

    /// Infers the type of a node; nodes without a value type infer as
    /// undefined.
    #[must_use]
    pub fn infer(&self, node: NodeId) -> InferredType {
        self.try_infer(node).unwrap_or_else(InferredType::undefined)
    }

    /// Infers the type of a node, or `None` if the node has no value type or
    /// depends on an unbound name.
    #[must_use]
    pub fn try_infer(&self, node: NodeId) -> Option<InferredType> {
        self.infer_at(node, 0)
    }

    fn infer_at(&self, node: NodeId, depth: usize) -> Option<InferredType> {
        if depth > MAX_INFERENCE_DEPTH {
            return None;
        }
        let depth = depth + 1;

        match &self.ast[node] {
            SyntaxNode::ScalarLiteral(literal) => Some(InferredType::new(literal_type(
                literal.token,
                &literal.lexeme,
            ))),

            SyntaxNode::ColumnReference(column) => {
                let name = Some(column.column_name().to_string());
                match self.bindings.get(node)? {
                    Binding::Property { entity, index } => {
                        let property = entity.properties.get(*index)?;
                        Some(InferredType::named(property.union_type, property.name.clone()))
                    }
                    Binding::Column(projected) => self
                        .infer_at(*projected, depth)
                        .map(|inferred| inferred.with_name(name)),
                    Binding::EnumValue(member) => Some(
                        InferredType::new(UnionType::entity(member.type_code)).with_name(name),
                    ),
                    _ => None,
                }
            }

            SyntaxNode::ColumnExpression(column) => {
                let inferred = self.infer_at(column.expression, depth)?;
                Some(inferred.with_name(column.alias.clone()))
            }

            SyntaxNode::VariableReference(variable) => {
                let union_type = self.bindings.get(node)?.as_variable()?.union_type()?;
                Some(InferredType::named(
                    union_type,
                    variable.name.trim_start_matches('@'),
                ))
            }

            SyntaxNode::Case(case) => {
                let mut union_type = UnionType::undefined();
                for branch in case.when.iter().chain(case.otherwise.iter()) {
                    if let Some(inferred) = self.infer_at(*branch, depth) {
                        union_type.merge(&inferred.union_type);
                    }
                }
                Some(InferredType::new(union_type))
            }

            SyntaxNode::When(when) => self.infer_at(when.then, depth),

            SyntaxNode::FunctionCall(function) => {
                if let Some(builtin) = BuiltinFunction::lookup(&function.name) {
                    return Some(InferredType::new(builtin.result.into()));
                }
                let mut union_type = UnionType::undefined();
                for argument in &function.arguments {
                    if let Some(inferred) = self.infer_at(*argument, depth) {
                        union_type.merge(&inferred.union_type);
                    }
                }
                Some(InferredType::new(union_type))
            }

            SyntaxNode::Unary(unary) => match unary.op {
                UnaryOp::Minus => self
                    .infer_at(unary.expression, depth)
                    .map(|inferred| InferredType::new(inferred.union_type)),
                UnaryOp::Not => Some(InferredType::new(UnionTag::Boolean.into())),
            },

            SyntaxNode::Binary(binary) => {
                let mut union_type = UnionType::undefined();
                for operand in [binary.left, binary.right] {
                    if let Some(inferred) = self.infer_at(operand, depth) {
                        union_type.merge(&inferred.union_type);
                    }
                }
                Some(InferredType::new(union_type))
            }

            SyntaxNode::Group(group) => self.infer_at(group.expression, depth),

            SyntaxNode::Comparison(_)
            | SyntaxNode::Logical(_)
            | SyntaxNode::Exists(_)
            | SyntaxNode::InList(_) => Some(InferredType::new(UnionTag::Boolean.into())),

            // Scalar subquery: the type of its first projected column.
            SyntaxNode::SelectExpression(select) => {
                let first = *select.columns.first()?;
                self.infer_at(first, depth)
            }

            SyntaxNode::TableUnion(union) => self.infer_at(union.left, depth),

            SyntaxNode::Script(_)
            | SyntaxNode::Declare(_)
            | SyntaxNode::TypeIdentifier(_)
            | SyntaxNode::Select(_)
            | SyntaxNode::Insert(_)
            | SyntaxNode::Update(_)
            | SyntaxNode::Delete(_)
            | SyntaxNode::Upsert(_)
            | SyntaxNode::Consume(_)
            | SyntaxNode::CommonTables(_)
            | SyntaxNode::CommonTable(_)
            | SyntaxNode::TableReference(_)
            | SyntaxNode::TableExpression(_)
            | SyntaxNode::TableJoin(_)
            | SyntaxNode::Over(_)
            | SyntaxNode::OrderItem(_)
            | SyntaxNode::SetExpression(_)
            | SyntaxNode::Output(_)
            | SyntaxNode::Into(_) => None,
        }
    }
}

/// Maps a literal token to its type; `NULL` admits no kind.
fn literal_type(token: LiteralToken, lexeme: &str) -> UnionType {
    match token {
        LiteralToken::Boolean => UnionTag::Boolean.into(),
        LiteralToken::Number => UnionTag::Numeric.into(),
        LiteralToken::DateTime => UnionTag::DateTime.into(),
        LiteralToken::String => UnionTag::String.into(),
        LiteralToken::Binary => UnionTag::Binary.into(),
        LiteralToken::Uuid => UnionTag::Uuid.into(),
        LiteralToken::Entity => lexeme
            .parse::<Entity>()
            .map_or_else(|_| UnionTag::Entity.into(), |e| UnionType::entity(e.type_code)),
        LiteralToken::Null => UnionType::undefined(),
    }
}
