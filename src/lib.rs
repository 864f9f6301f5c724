//! unionsql - semantic core of a SQL-dialect compiler over union-typed columns
//!
//! A parsed script is bound against a schema provider, its expressions are
//! typed as [`UnionType`]s, and bound row sources are expanded into physical
//! column layouts and INSERT/UPDATE mapping rules.
//!
//! ```
//! use unionsql::binder::bind;
//! use unionsql::catalog::{Catalog, EntityDefinition, PropertyDefinition};
//! use unionsql::parser::ast::{Ast, SelectExpression};
//! use unionsql::types::UnionTag;
//!
//! let mut catalog = Catalog::new();
//! catalog
//!     .add_entity(
//!         EntityDefinition::new(
//!             7,
//!             "Справочник.Склад",
//!             "_Reference7",
//!             vec![PropertyDefinition::new("Код", "_Code", UnionTag::String.into())],
//!         )
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let mut ast = Ast::new();
//! let column = ast.projection("s.Код", None);
//! let table = ast.table("Справочник.Склад", Some("s"));
//! let select = ast.select(SelectExpression::new(vec![column]).from(table));
//! let statement = ast.select_statement(None, select);
//! let script = ast.script(vec![statement]);
//!
//! let bound = bind(&ast, script, &catalog).unwrap();
//! assert!(bound.is_success());
//! ```

pub mod binder;
pub mod catalog;
pub mod error;
pub mod mapping;
pub mod parser;
pub mod types;

pub use binder::{bind, Binder, BinderConfig, BoundScript, InferredType, TypeInferencer};
pub use catalog::{Catalog, EntityDefinition, PropertyDefinition, SchemaProvider};
pub use error::{BindError, Result, TokenKind, UnionSqlError};
pub use mapping::{create_entity_map, create_mapping_rules, EntityMapper, MappingGenerator};
pub use types::{ColumnPurpose, Entity, UnionTag, UnionType, Value};
