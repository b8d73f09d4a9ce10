//! `Name` -> `ResolvedName` and type-`Name` -> `ResolvedName` rewriting.
//!
//! Lookup starts at the scope the name was walked in (recorded by
//! `scope_builder`) and walks outward. Scoped IDs (`Module::x`) are looked
//! up by their full dotted string, which only matches a binding inserted
//! under that exact qualified key — cross-module import resolution that
//! skips straight to a named module's top scope is not implemented; see
//! `DESIGN.md`.

use bpc_ast::{Context, Expression, NodeId, NodeKind, ScopeId, UnqualifiedType};
use bpc_common::diagnostics::{Diagnostic, DiagnosticKind, Priority};
use rustc_hash::FxHashMap;

/// Rewrites every `Expression::Name` reachable from `root` into a
/// `ResolvedName` if its scope binds it. Returns whether any rewrite
/// happened, so the fixpoint driver can tell resolution made progress.
pub fn resolve_names(ctx: &mut Context, root: NodeId, node_scope: &FxHashMap<NodeId, ScopeId>) -> bool {
    let mut changed = false;
    resolve_names_rec(ctx, root, node_scope, &mut changed);
    changed
}

fn resolve_names_rec(ctx: &mut Context, id: NodeId, node_scope: &FxHashMap<NodeId, ScopeId>, changed: &mut bool) {
    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        resolve_names_rec(ctx, child, node_scope, changed);
    }

    let name_lookup = match &ctx.node(id).kind {
        NodeKind::Expression(Expression::Name { id: name, scope }) => {
            let start = scope.or_else(|| node_scope.get(&id).copied());
            Some((name.clone(), start))
        }
        _ => None,
    };

    let Some((name, start_scope)) = name_lookup else {
        return;
    };

    let Some(scope) = start_scope else {
        return;
    };

    match ctx.scopes().lookup(scope, name.as_str()) {
        Ok(Some(decl_idx)) => {
            let parent = ctx.node(id).parent;
            let location = ctx.node(id).meta.location.clone();
            let resolved = ctx.alloc(location, NodeKind::Expression(Expression::ResolvedName(decl_idx)));
            if let Some(parent) = parent {
                ctx.replace_child(parent, id, resolved);
                *changed = true;
            }
        }
        Ok(None) => {
            let location = ctx.node(id).meta.location.clone();
            ctx.diagnostics_mut().push(Diagnostic::error(
                DiagnosticKind::Lookup,
                location,
                format!("unresolved name '{name}'"),
                Priority::High,
            ));
        }
        Err(_) => {
            let location = ctx.node(id).meta.location.clone();
            ctx.diagnostics_mut().push(Diagnostic::error(
                DiagnosticKind::Lookup,
                location,
                format!("scope chain for '{name}' is corrupted"),
                Priority::High,
            ));
        }
    }
}

/// Rewrites every `UnqualifiedType::Name` into `ResolvedName`, reusing the
/// `TypeIndex` already registered for the referenced declaration's declared
/// type. This realizes the "an alias never gets its own type index" rule:
/// resolving `type Bar = Foo;` just points `Bar` at `Foo`'s index.
pub fn resolve_type_names(
    ctx: &mut Context,
    root: NodeId,
    node_scope: &FxHashMap<NodeId, ScopeId>,
    type_index_of: &FxHashMap<NodeId, bpc_ast::TypeIndex>,
) -> bool {
    let mut changed = false;
    resolve_type_names_rec(ctx, root, node_scope, type_index_of, &mut changed);
    changed
}

fn resolve_type_names_rec(
    ctx: &mut Context,
    id: NodeId,
    node_scope: &FxHashMap<NodeId, ScopeId>,
    type_index_of: &FxHashMap<NodeId, bpc_ast::TypeIndex>,
    changed: &mut bool,
) {
    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        resolve_type_names_rec(ctx, child, node_scope, type_index_of, changed);
    }

    let name = match &ctx.node(id).kind {
        NodeKind::UnqualifiedType(UnqualifiedType::Name(name)) => name.clone(),
        _ => return,
    };

    let Some(&scope) = node_scope.get(&id) else {
        return;
    };

    match ctx.scopes().lookup(scope, name.as_str()) {
        Ok(Some(decl_idx)) => {
            let referenced = ctx.lookup_declaration(decl_idx);
            let Some(declared_ty) = ctx.declaration(referenced).declared_type() else {
                return;
            };
            let Some(&type_idx) = type_index_of.get(&declared_ty) else {
                return;
            };
            ctx.node_mut(id).kind = NodeKind::UnqualifiedType(UnqualifiedType::ResolvedName(type_idx));
            *changed = true;
        }
        Ok(None) => {
            let location = ctx.node(id).meta.location.clone();
            ctx.diagnostics_mut().push(Diagnostic::error(
                DiagnosticKind::Lookup,
                location,
                format!("unresolved type name '{name}'"),
                Priority::High,
            ));
        }
        Err(_) => {
            let location = ctx.node(id).meta.location.clone();
            ctx.diagnostics_mut().push(Diagnostic::error(
                DiagnosticKind::Lookup,
                location,
                format!("scope chain for type '{name}' is corrupted"),
                Priority::High,
            ));
        }
    }
}
