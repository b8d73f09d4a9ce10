//! Attribute-specific coercions: `&size` must reduce to a `uint64`, and
//! `&requires` is rewritten from a boolean condition into a ternary that
//! yields an error value that unit lowering can check against.

use bpc_ast::{
    AttributeSet, Constness, Ctor, Expression, NodeId, NodeKind, QualifiedType, Statement, UnitField, UnqualifiedType,
};
use bpc_coerce::{coerce_expression, CoercionStyle};
use bpc_common::diagnostics::{Diagnostic, DiagnosticKind, Priority};

const SIZE_ATTR: &str = "size";

/// Walks every `AttributeSet` reachable from `root`, coercing a literal
/// `&size=N` value to `uint64` in place. Non-literal `&size` expressions are
/// left for `instantiate_operators` to type, since only a literal's type is
/// knowable without a full expression-typing pass.
pub fn coerce_size_attributes(ctx: &mut bpc_ast::Context, root: NodeId) -> bool {
    let mut changed = false;
    coerce_size_rec(ctx, root, &mut changed);
    changed
}

fn coerce_size_rec(ctx: &mut bpc_ast::Context, id: NodeId, changed: &mut bool) {
    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        coerce_size_rec(ctx, child, changed);
    }

    let value = match &ctx.node(id).kind {
        NodeKind::Attribute(attr) if attr.name == SIZE_ATTR => attr.value,
        _ => return,
    };
    let Some(value) = value else { return };

    let is_literal_integer = matches!(
        &ctx.node(value).kind,
        NodeKind::Expression(Expression::Ctor(ctor)) if matches!(&ctx.node(*ctor).kind, NodeKind::Ctor(Ctor::Integer(_)))
    );
    if !is_literal_integer {
        return;
    }

    let location = ctx.node(value).meta.location.clone();
    let uint64_ty = ctx.alloc(location.clone(), NodeKind::UnqualifiedType(UnqualifiedType::Integer { width: 64, signed: false }));
    let dst_qty = ctx.alloc(
        location.clone(),
        NodeKind::QualifiedType(QualifiedType { ty: uint64_ty, constness: Constness::Const, is_alias: false }),
    );
    let int64_ty = ctx.alloc(location.clone(), NodeKind::UnqualifiedType(UnqualifiedType::Integer { width: 64, signed: true }));
    let src_qty = ctx.alloc(
        location,
        NodeKind::QualifiedType(QualifiedType { ty: int64_ty, constness: Constness::Const, is_alias: false }),
    );

    let style = CoercionStyle::TRY_EXACT_MATCH | CoercionStyle::TRY_COERCION;
    match coerce_expression(ctx, value, src_qty, dst_qty, style) {
        Ok(coerced) => {
            if coerced.consider_type_changed {
                // The integer-literal ctor rule reports a type change without
                // allocating a new node (`nexpr: false`): it just confirms the
                // value fits. `&size`'s value has nowhere else to carry its
                // new type, so wrap it in `Coerced` ourselves — the same node
                // `coerce_expression`'s own rule 12 fallback would produce.
                let new_value = if coerced.nexpr {
                    coerced.coerced_node
                } else {
                    let location = ctx.node(coerced.coerced_node).meta.location.clone();
                    ctx.alloc(
                        location,
                        NodeKind::Expression(Expression::Coerced { inner: coerced.coerced_node, target_type: dst_qty }),
                    )
                };
                if let NodeKind::Attribute(attr) = &mut ctx.node_mut(id).kind {
                    attr.value = Some(new_value);
                }
                ctx.append_child(id, new_value);
                *changed = true;
            }
        }
        Err(e) => {
            let location = ctx.node(value).meta.location.clone();
            ctx.diagnostics_mut().push(Diagnostic::error(
                DiagnosticKind::Attribute,
                location,
                format!("'&size' must reduce to uint64: {e}"),
                Priority::Normal,
            ));
        }
    }
}

/// Rewrites a unit field's `condition` (the original `&requires` boolean
/// expression) into `cond ? True : error("requires failed")`, once. Guarded
/// by checking the condition isn't already a `Ternary`, since the fixpoint
/// driver re-runs every pass every round.
pub fn rewrite_requires_conditions(ctx: &mut bpc_ast::Context, root: NodeId) -> bool {
    let mut changed = false;
    rewrite_requires_rec(ctx, root, &mut changed);
    changed
}

fn rewrite_requires_rec(ctx: &mut bpc_ast::Context, id: NodeId, changed: &mut bool) {
    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        rewrite_requires_rec(ctx, child, changed);
    }

    let condition = match &ctx.node(id).kind {
        NodeKind::Statement(Statement::UnitField(UnitField { condition: Some(cond), .. })) => Some(*cond),
        _ => None,
    };
    let Some(condition) = condition else { return };

    if matches!(&ctx.node(condition).kind, NodeKind::Expression(Expression::Ternary { .. })) {
        return;
    }

    let location = ctx.node(condition).meta.location.clone();
    let true_ctor = ctx.alloc(location.clone(), NodeKind::Ctor(Ctor::Bool(true)));
    let true_expr = ctx.alloc(location.clone(), NodeKind::Expression(Expression::Ctor(true_ctor)));
    let error_ctor = ctx.alloc(location.clone(), NodeKind::Ctor(Ctor::Error("requires failed".into())));
    let error_expr = ctx.alloc(location.clone(), NodeKind::Expression(Expression::Ctor(error_ctor)));
    let ternary = ctx.alloc(
        location,
        NodeKind::Expression(Expression::Ternary {
            condition,
            then_expr: true_expr,
            else_expr: error_expr,
        }),
    );

    if let NodeKind::Statement(Statement::UnitField(field)) = &mut ctx.node_mut(id).kind {
        field.condition = Some(ternary);
    }
    ctx.append_child(id, ternary);
    *changed = true;
}

/// Looks up an attribute by name within an `AttributeSet` node.
#[must_use]
pub fn find_attribute<'c>(ctx: &'c bpc_ast::Context, attribute_set: NodeId, name: &str) -> Option<&'c bpc_ast::Attribute> {
    let AttributeSet { attributes } = match &ctx.node(attribute_set).kind {
        NodeKind::AttributeSet(set) => set,
        _ => return None,
    };
    attributes.iter().find_map(|&id| match &ctx.node(id).kind {
        NodeKind::Attribute(a) if a.name == name => Some(a),
        _ => None,
    })
}
