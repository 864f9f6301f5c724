//! Binder module for semantic analysis.
//!
//! The binder walks a parsed script and resolves:
//! - Table names against script-defined tables and the schema
//! - Column names against the aliases visible in the enclosing scopes
//! - Variables, declared types and enumeration members
//!
//! The output is a scope tree plus a side table of bindings keyed by node,
//! which the type inferencer and the mapping generator consume.

mod binding;
mod config;
mod inference;
mod scope;
mod semantic;

pub use binding::{
    Binding, Bindings, BuiltinFunction, TableBinding, VariableBinding, BUILTIN_FUNCTIONS,
};
pub use config::{BinderConfig, DEFAULT_MAX_DEPTH};
pub use inference::{InferredType, TypeInferencer};
pub use scope::{is_pseudo_table, AliasTarget, Scope, ScopeId, ScopeTree};
pub use semantic::{bind, Binder, BoundScript};
