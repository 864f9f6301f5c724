//! Error types for unionsql semantic analysis.

use std::fmt;

use thiserror::Error;

/// Result type alias using [`UnionSqlError`].
pub type Result<T> = std::result::Result<T, UnionSqlError>;

/// Error types for unionsql operations.
#[derive(Debug, Error)]
pub enum UnionSqlError {
    /// The schema provider failed while answering a lookup.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The syntax tree or scope nesting violates a structural contract.
    ///
    /// These indicate a parser bug, not a user script error.
    #[error("Structural error: {0}")]
    Structure(String),

    /// A name could not be bound.
    #[error("Bind error: {0}")]
    Bind(String),

    /// Mapping rules were requested for nodes that cannot be mapped.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A literal could not be decoded into a value.
    #[error("Invalid literal '{literal}': {message}")]
    InvalidLiteral { literal: String, message: String },
}

/// The kind of name a failed resolution was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Table, CTE, temporary table or table variable.
    Table,
    /// Column or property.
    Column,
    /// Variable reference.
    Variable,
    /// Type name of a DECLARE statement.
    Type,
}

impl TokenKind {
    /// Returns the name used in diagnostics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Table => "table",
            TokenKind::Column => "column",
            TokenKind::Variable => "variable",
            TokenKind::Type => "type",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable binding diagnostic.
///
/// The binder collects these instead of failing, so one pass reports every
/// unresolved name of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A name did not resolve against any visible scope or the schema.
    Unresolved { kind: TokenKind, identifier: String },
    /// The schema provider failed; binding stopped at that point.
    Schema(String),
}

impl BindError {
    /// Creates an unresolved-name diagnostic.
    #[must_use]
    pub fn unresolved(kind: TokenKind, identifier: impl Into<String>) -> Self {
        BindError::Unresolved {
            kind,
            identifier: identifier.into(),
        }
    }

    /// Returns the identifier of an unresolved-name diagnostic.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        match self {
            BindError::Unresolved { identifier, .. } => Some(identifier),
            BindError::Schema(_) => None,
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::Unresolved { kind, identifier } => {
                write!(f, "Failed to bind [{kind}: {identifier}]")
            }
            BindError::Schema(message) => write!(f, "Schema lookup failed: {message}"),
        }
    }
}

impl std::error::Error for BindError {}

impl From<BindError> for UnionSqlError {
    fn from(err: BindError) -> Self {
        UnionSqlError::Bind(err.to_string())
    }
}
