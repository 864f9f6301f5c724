//! Binder configuration.

/// Default limit on syntax tree nesting during binding.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Configuration for the binder.
#[derive(Debug, Clone)]
pub struct BinderConfig {
    /// Report a diagnostic when an unqualified column, `inserted` or `deleted`
    /// is resolved in a scope with more than one table source, instead of
    /// picking the first one.
    pub strict_pseudo_tables: bool,
    /// Maximum nesting depth of the syntax tree; deeper trees are rejected as
    /// structurally invalid.
    pub max_depth: usize,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            strict_pseudo_tables: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl BinderConfig {
    /// Creates a new binder configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets strict resolution of pseudo-tables and unqualified columns.
    #[must_use]
    pub fn with_strict_pseudo_tables(mut self, strict: bool) -> Self {
        self.strict_pseudo_tables = strict;
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
