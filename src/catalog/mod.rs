//! Schema metadata consumed by the binder.

mod schema;

use std::sync::Arc;

use crate::error::Result;

pub use schema::{name_key, names_equal, Catalog, EntityDefinition, EnumMember, PropertyDefinition};

/// Read-only schema lookups used during binding.
///
/// Implementations must return `Ok(None)` for unknown names. An `Err` is
/// tolerated but stops binding and is reported as a single diagnostic.
/// Providers are shared between concurrent compiles.
pub trait SchemaProvider: Send + Sync {
    /// Looks up a table-like object or record type by qualified name.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying metadata source fails.
    fn get_metadata_object(&self, name: &str) -> Result<Option<Arc<EntityDefinition>>>;

    /// Looks up an enumeration member by `Enum.Name.Member` qualified name.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying metadata source fails.
    fn try_get_enum_value(&self, qualified_name: &str) -> Result<Option<EnumMember>>;
}
