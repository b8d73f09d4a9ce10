//! Declaration/type registration and scope-tree construction, combined into
//! one recursive walk: scope insertion needs a [`DeclarationIndex`] to
//! already exist, so there is no benefit to splitting registration out as a
//! separate pass the way the coercion engine and operator instantiation are.

use bpc_ast::{Context, Declaration, NodeId, NodeKind, ScopeId, UnqualifiedType};
use rustc_hash::FxHashMap;

/// Builds a fresh scope tree over the subtree rooted at `root`, registering
/// every declaration and type declaration it finds along the way.
///
/// `type_index_of` maps a type declaration's declared-type node to the
/// `TypeIndex` it was registered under; `names.rs` consults this so that
/// resolving a type alias reuses the aliased type's index rather than
/// minting a new one. `node_scope` records which scope each node was walked
/// in, so later passes can resolve a `Name` without re-walking parents.
pub fn build_scopes(
    ctx: &mut Context,
    root: NodeId,
    type_index_of: &mut FxHashMap<NodeId, bpc_ast::TypeIndex>,
    node_scope: &mut FxHashMap<NodeId, ScopeId>,
) -> ScopeId {
    let top = ctx.scopes_mut().new_scope(None);
    walk_in_scope(ctx, root, top, type_index_of, node_scope);
    top
}

fn walk_in_scope(
    ctx: &mut Context,
    id: NodeId,
    scope: ScopeId,
    type_index_of: &mut FxHashMap<NodeId, bpc_ast::TypeIndex>,
    node_scope: &mut FxHashMap<NodeId, ScopeId>,
) {
    node_scope.insert(id, scope);

    let mut child_scope = scope;

    if let NodeKind::Declaration(decl) = &ctx.node(id).kind {
        let local_name = decl.header().id.local_name().to_string();
        let idx = ctx.register_declaration(id);
        ctx.scopes_mut().insert(scope, local_name, idx);

        if ctx.declaration(id).is_type_decl() {
            if let Some(ty) = ctx.declaration(id).declared_type() {
                if !matches!(ctx.unqualified_type(ty), UnqualifiedType::Auto) {
                    if let Ok(type_idx) = ctx.register_type(ty) {
                        type_index_of.insert(ty, type_idx);
                    }
                }
            }
        }

        if matches!(ctx.declaration(id), Declaration::Module(_)) {
            child_scope = ctx.scopes_mut().new_scope(Some(scope));
        }
    }

    if let NodeKind::UnqualifiedType(ty) = &ctx.node(id).kind {
        if matches!(ty, UnqualifiedType::Struct { .. } | UnqualifiedType::Unit { .. }) {
            child_scope = ctx.scopes_mut().new_scope(Some(scope));
        }
    }

    if let NodeKind::Function(_) = &ctx.node(id).kind {
        child_scope = ctx.scopes_mut().new_scope(Some(scope));
    }

    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        walk_in_scope(ctx, child, child_scope, type_index_of, node_scope);
    }
}
