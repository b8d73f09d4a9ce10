//! Self-recursive unit detection and the `on_heap` rewrite.
//!
//! A unit that (directly or through a chain of containers/refs) contains a
//! field of its own type cannot be laid out inline: the generated record
//! would be infinitely sized. `Context::compute_dependencies` already
//! detects this for free, since a self-referential `ResolvedName` makes a
//! declaration list itself among its own dependents; this module only
//! needs to check that and flip the bit.

use bpc_ast::{Context, Declaration, DeclarationIndex, NodeId, NodeKind, UnqualifiedType};
use smallvec::SmallVec;

/// Finds every top-level `TypeDecl` whose declared type is
/// `UnqualifiedType::Unit`, returning `(declaration, type node, items,
/// properties)` for each. Walks the tree rather than a `declarations_by_index`
/// scan, matching how `bpc-resolve`'s unit-lowering passes find their targets.
pub fn collect_units(ctx: &Context, root: NodeId) -> Vec<(DeclarationIndex, NodeId, Vec<NodeId>, Vec<NodeId>)> {
    let mut units = Vec::new();
    collect_units_rec(ctx, root, &mut units);
    units
}

fn collect_units_rec(
    ctx: &Context,
    id: NodeId,
    units: &mut Vec<(DeclarationIndex, NodeId, Vec<NodeId>, Vec<NodeId>)>,
) {
    let children: SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        collect_units_rec(ctx, child, units);
    }

    let ty = match &ctx.node(id).kind {
        NodeKind::Declaration(Declaration::TypeDecl { ty, .. }) => *ty,
        _ => return,
    };
    let (items, properties) = match ctx.unqualified_type(ty) {
        UnqualifiedType::Unit { items, properties, .. } => (items.clone(), properties.clone()),
        _ => return,
    };
    let Some(decl_idx) = ctx.declaration_index_of_type(ty) else { return };
    units.push((decl_idx, ty, items, properties));
}

/// For every self-recursive unit (one that depends on itself, per
/// `Context::dependent_declarations` after a fresh `compute_dependencies`),
/// flips `on_heap` to `true` on its declared `Unit` type if it isn't
/// already. Returns whether anything changed, for the fixpoint driver.
///
/// This is the full extent of the "rewrite into a record type" unit
/// lowering does here: the AST's `UnqualifiedType::Unit` is already
/// record-shaped, so no separate struct node is introduced.
pub fn tag_self_recursive_units_on_heap(ctx: &mut Context, root: NodeId) -> bool {
    ctx.compute_dependencies();
    let units = collect_units(ctx, root);

    let mut changed = false;
    for (decl_idx, ty, ..) in units {
        if !ctx.dependent_declarations(decl_idx).contains(&decl_idx) {
            continue;
        }
        let already_on_heap = matches!(ctx.unqualified_type(ty), UnqualifiedType::Unit { on_heap: true, .. });
        if already_on_heap {
            continue;
        }
        if let NodeKind::UnqualifiedType(UnqualifiedType::Unit { on_heap, .. }) = &mut ctx.node_mut(ty).kind {
            *on_heap = true;
            changed = true;
        }
    }
    changed
}
