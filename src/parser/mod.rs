//! Syntax tree consumed by the binder.
//!
//! Parsing itself happens upstream; this module defines the node arena that
//! parsers build and analysis passes read.

pub mod ast;

pub use ast::{Ast, NodeId, NodeKind, SyntaxNode};
