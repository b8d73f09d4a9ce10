//! Lexical scopes: each node may own one, mapping local names to declarations.
//!
//! Lookups walk parent pointers until a match is found or the root is
//! reached. Scoped IDs (containing `::`) bypass intermediate scopes and
//! resolve relative to the nearest enclosing module, or to a named imported
//! module — that policy lives in `bpc-resolve`, which is the only crate that
//! walks the AST to decide *which* scope a name should start its search in;
//! this module just stores the chain and performs the walk once a starting
//! scope is known.

use crate::error::InternalError;
use crate::ids::{DeclarationIndex, ScopeId};
use bpc_common::limits::MAX_SCOPE_WALK_ITERATIONS;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    names: FxHashMap<String, DeclarationIndex>,
}

/// The full set of scopes for one [`crate::context::Context`].
///
/// Scope caches are cleared before every resolver pass (`clear`), then
/// rebuilt fresh as the resolver's visitor walks the tree.
#[derive(Debug, Default)]
pub struct ScopeTable {
    scopes: Vec<ScopeData>,
}

impl ScopeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(ScopeData {
            parent,
            names: FxHashMap::default(),
        });
        ScopeId::new(self.scopes.len() as u32)
    }

    pub fn insert(&mut self, scope: ScopeId, name: impl Into<String>, decl: DeclarationIndex) {
        self.scopes[scope.slot()].names.insert(name.into(), decl);
    }

    /// Looks up `name` starting at `scope` and walking toward the root.
    /// Returns `Ok(None)` if no enclosing scope binds the name, or an
    /// internal error if the chain exceeds the iteration safety net (which
    /// only a corrupted, non-tree-shaped parent chain could trigger, since
    /// scope parents are acyclic by construction).
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Result<Option<DeclarationIndex>, InternalError> {
        let mut current = Some(scope);
        let mut steps = 0u32;
        while let Some(id) = current {
            steps += 1;
            if steps > MAX_SCOPE_WALK_ITERATIONS {
                return Err(InternalError::ScopeChainCorrupted);
            }
            let data = &self.scopes[id.slot()];
            if let Some(decl) = data.names.get(name) {
                return Ok(Some(*decl));
            }
            current = data.parent;
        }
        Ok(None)
    }

    /// Drops every scope. Called at the start of each resolver round before
    /// scopes are rebuilt from the current tree shape.
    pub fn clear(&mut self) {
        self.scopes.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_to_parent_scope() {
        let mut table = ScopeTable::new();
        let root = table.new_scope(None);
        let child = table.new_scope(Some(root));
        table.insert(root, "x", DeclarationIndex::new(1));

        assert_eq!(table.lookup(child, "x").unwrap(), Some(DeclarationIndex::new(1)));
        assert_eq!(table.lookup(root, "y").unwrap(), None);
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let mut table = ScopeTable::new();
        let root = table.new_scope(None);
        let child = table.new_scope(Some(root));
        table.insert(root, "x", DeclarationIndex::new(1));
        table.insert(child, "x", DeclarationIndex::new(2));

        assert_eq!(table.lookup(child, "x").unwrap(), Some(DeclarationIndex::new(2)));
    }

    #[test]
    fn clear_drops_every_scope() {
        let mut table = ScopeTable::new();
        table.new_scope(None);
        table.new_scope(None);
        table.clear();
        assert!(table.is_empty());
    }
}
