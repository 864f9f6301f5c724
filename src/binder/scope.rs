//! Binder scope tree for name resolution.
//!
//! Scopes live in an arena and link to two parents: the logical parent used
//! for name lookups and the physical parent restored on close. They differ
//! for non-correlated subqueries, which are re-parented past enclosing
//! non-correlated selects so that they see statement-wide tables (CTEs) but
//! not the aliases of the select that lexically contains them.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::catalog::name_key;
use crate::error::{Result, UnionSqlError};
use crate::parser::ast::{NodeId, NodeKind};

use super::binding::{Binding, TableBinding, VariableBinding};

/// Index of a scope inside its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    /// Returns the arena index of this scope.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Table source registered under an alias.
#[derive(Debug, Clone)]
pub struct AliasTarget {
    /// Node that introduced the alias.
    pub node: NodeId,
    pub binding: TableBinding,
}

/// A lexical/logical region of name visibility.
#[derive(Debug, Clone)]
pub struct Scope {
    id: ScopeId,
    owner: NodeId,
    kind: NodeKind,
    correlated: bool,
    logical_parent: Option<ScopeId>,
    physical_parent: Option<ScopeId>,
    /// CTEs, temporary tables and table variables; visible to nested scopes.
    tables: HashMap<String, TableBinding>,
    /// Table sources of the local select or DML target, in registration order.
    aliases: IndexMap<String, AliasTarget>,
    /// Resolved columns, kept for diagnostics.
    columns: HashMap<String, Binding>,
    variables: HashMap<String, VariableBinding>,
}

impl Scope {
    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Returns the node that opened this scope.
    #[must_use]
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Returns the kind of the owner node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn is_correlated(&self) -> bool {
        self.correlated
    }

    /// Returns the parent used for name lookups.
    #[must_use]
    pub fn logical_parent(&self) -> Option<ScopeId> {
        self.logical_parent
    }

    /// Returns the scope that was current when this one was opened.
    #[must_use]
    pub fn physical_parent(&self) -> Option<ScopeId> {
        self.physical_parent
    }

    /// Returns a table binding registered directly in this scope.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableBinding> {
        self.tables.get(&name_key(name))
    }

    /// Returns a variable binding registered directly in this scope.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableBinding> {
        self.variables.get(&name_key(name))
    }

    /// Returns an alias registered directly in this scope.
    #[must_use]
    pub fn alias(&self, alias: &str) -> Option<&AliasTarget> {
        self.aliases.get(&name_key(alias))
    }

    /// Returns the aliases of this scope in registration order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &AliasTarget)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of aliases registered in this scope.
    #[must_use]
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Returns a cached column resolution.
    #[must_use]
    pub fn column(&self, identifier: &str) -> Option<&Binding> {
        self.columns.get(&name_key(identifier))
    }
}

/// Returns true for the SQL pseudo-tables of OUTPUT clauses.
#[must_use]
pub fn is_pseudo_table(alias: &str) -> bool {
    alias.eq_ignore_ascii_case("inserted") || alias.eq_ignore_ascii_case("deleted")
}

/// Arena of scopes plus the cursor of the currently open one.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    current: Option<ScopeId>,
}

impl ScopeTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        ScopeTree {
            scopes: Vec::new(),
            current: None,
        }
    }

    /// Returns the first scope ever opened.
    #[must_use]
    pub fn root(&self) -> Option<ScopeId> {
        if self.scopes.is_empty() {
            None
        } else {
            Some(ScopeId(0))
        }
    }

    /// Returns the currently open scope.
    #[must_use]
    pub fn current(&self) -> Option<ScopeId> {
        self.current
    }

    /// Returns a scope by id.
    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Returns the number of scopes ever opened.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns true if no scope was opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Finds the scope opened by the given node.
    #[must_use]
    pub fn scope_of(&self, owner: NodeId) -> Option<ScopeId> {
        self.scopes.iter().find(|s| s.owner == owner).map(|s| s.id)
    }

    /// Opens a scope owned by `owner` and makes it current.
    ///
    /// A non-correlated select expression is re-parented past every enclosing
    /// non-correlated select up to the nearest statement or correlated select.
    ///
    /// # Errors
    ///
    /// Returns a structural error when a correlated select has no enclosing
    /// statement.
    pub fn open_scope(&mut self, owner: NodeId, kind: NodeKind, correlated: bool) -> Result<ScopeId> {
        let physical_parent = self.current;

        let logical_parent = if kind == NodeKind::SelectExpression && !correlated {
            let mut candidate = physical_parent;
            while let Some(parent) = candidate {
                let scope = self.scope(parent);
                if scope.kind == NodeKind::SelectExpression && !scope.correlated {
                    candidate = scope.logical_parent;
                } else {
                    break;
                }
            }
            candidate
        } else {
            physical_parent
        };

        if correlated
            && !self
                .chain(physical_parent)
                .any(|s| s.kind != NodeKind::SelectExpression)
        {
            return Err(UnionSqlError::Structure(format!(
                "correlated subquery {owner} has no enclosing statement"
            )));
        }

        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            id,
            owner,
            kind,
            correlated,
            logical_parent,
            physical_parent,
            tables: HashMap::new(),
            aliases: IndexMap::new(),
            columns: HashMap::new(),
            variables: HashMap::new(),
        });
        self.current = Some(id);

        debug!(scope = id.0, ?kind, %owner, correlated, parent = ?logical_parent.map(|p| p.0), "open scope");
        Ok(id)
    }

    /// Closes the current scope and restores its physical parent.
    ///
    /// # Errors
    ///
    /// Returns a structural error if no scope is open.
    pub fn close_scope(&mut self) -> Result<ScopeId> {
        let id = self
            .current
            .ok_or_else(|| UnionSqlError::Structure("close_scope without an open scope".into()))?;
        self.current = self.scope(id).physical_parent;
        debug!(scope = id.0, "close scope");
        Ok(id)
    }

    /// Closes every open scope, leaving the tree as built so far.
    pub(crate) fn close_all(&mut self) {
        self.current = None;
    }

    /// Iterates from `start` through its logical parents.
    pub fn chain(&self, start: Option<ScopeId>) -> impl Iterator<Item = &Scope> {
        std::iter::successors(start.map(|id| self.scope(id)), |scope| {
            scope.logical_parent.map(|id| self.scope(id))
        })
    }

    /// Looks up a variable from the current scope outwards; inner
    /// declarations shadow outer ones.
    #[must_use]
    pub fn variable_binding(&self, name: &str) -> Option<&VariableBinding> {
        let key = name_key(name);
        self.chain(self.current).find_map(|s| s.variables.get(&key))
    }

    /// Looks up a CTE, temporary table or table variable from the current
    /// scope outwards.
    #[must_use]
    pub fn table_binding(&self, name: &str) -> Option<&TableBinding> {
        let key = name_key(name);
        self.chain(self.current).find_map(|s| s.tables.get(&key))
    }

    /// Resolves a column qualifier to its table source.
    ///
    /// An empty qualifier or the pseudo-tables `inserted`/`deleted` resolve
    /// to the first alias of the current scope only.
    #[must_use]
    pub fn try_get_table_by_alias(&self, alias: &str) -> Option<&AliasTarget> {
        if alias.is_empty() || is_pseudo_table(alias) {
            return self
                .current
                .and_then(|id| self.scope(id).aliases.first())
                .map(|(_, target)| target);
        }
        let key = name_key(alias);
        self.chain(self.current).find_map(|s| s.aliases.get(&key))
    }

    /// Finds the nearest scope, from the current one outwards, whose owner
    /// is of the given kind.
    #[must_use]
    pub fn ancestor(&self, kind: NodeKind) -> Option<ScopeId> {
        self.ancestor_where(|k| k == kind)
    }

    /// Finds the nearest scope whose owner kind satisfies the predicate.
    #[must_use]
    pub fn ancestor_where(&self, predicate: impl Fn(NodeKind) -> bool) -> Option<ScopeId> {
        self.chain(self.current)
            .find(|s| predicate(s.kind))
            .map(|s| s.id)
    }

    fn current_mut(&mut self) -> Result<&mut Scope> {
        let id = self
            .current
            .ok_or_else(|| UnionSqlError::Structure("no open scope".into()))?;
        Ok(&mut self.scopes[id.0])
    }

    /// Registers a table binding in the current scope.
    ///
    /// # Errors
    ///
    /// Returns a structural error if no scope is open.
    pub fn add_table(&mut self, name: &str, binding: TableBinding) -> Result<()> {
        self.current_mut()?.tables.insert(name_key(name), binding);
        Ok(())
    }

    /// Registers a table binding in the given scope.
    pub fn add_table_to(&mut self, scope: ScopeId, name: &str, binding: TableBinding) {
        self.scopes[scope.0].tables.insert(name_key(name), binding);
    }

    /// Registers an alias in the current scope.
    ///
    /// # Errors
    ///
    /// Returns a structural error if no scope is open.
    pub fn add_alias(&mut self, alias: &str, target: AliasTarget) -> Result<()> {
        self.current_mut()?.aliases.insert(name_key(alias), target);
        Ok(())
    }

    /// Registers a variable in the current scope.
    ///
    /// # Errors
    ///
    /// Returns a structural error if no scope is open.
    pub fn add_variable(&mut self, name: &str, binding: VariableBinding) -> Result<()> {
        self.current_mut()?.variables.insert(name_key(name), binding);
        Ok(())
    }

    /// Caches a column resolution in the current scope.
    ///
    /// # Errors
    ///
    /// Returns a structural error if no scope is open.
    pub fn add_column(&mut self, identifier: &str, binding: Binding) -> Result<()> {
        self.current_mut()?.columns.insert(name_key(identifier), binding);
        Ok(())
    }
}
