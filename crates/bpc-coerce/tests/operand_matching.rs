//! Operator overload resolution's view of coercion: resolving a binary
//! operator's operand list against a candidate signature.

use bpc_ast::{Constness, Context, Expression, NodeKind, QualifiedType, UnqualifiedType};
use bpc_coerce::{coerce_operands, CoercionStyle};
use bpc_common::location::Location;

fn here() -> Location {
    Location::synthetic("ops.spicy")
}

fn qualified(ctx: &mut Context, ty: bpc_ast::NodeId, constness: Constness) -> bpc_ast::NodeId {
    ctx.alloc(here(), NodeKind::QualifiedType(QualifiedType { ty, constness, is_alias: false }))
}

#[test]
fn boolean_operands_match_a_logical_and_signature_unchanged() {
    let mut ctx = Context::new();
    let bool_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Bool));
    let lhs_qty = qualified(&mut ctx, bool_ty, Constness::Const);
    let rhs_qty = qualified(&mut ctx, bool_ty, Constness::Const);
    let dst_qty = qualified(&mut ctx, bool_ty, Constness::Const);

    let lhs = ctx.alloc(here(), NodeKind::Expression(Expression::Name { id: "a".into(), scope: None }));
    let rhs = ctx.alloc(here(), NodeKind::Expression(Expression::Name { id: "b".into(), scope: None }));

    let style = CoercionStyle::OPERAND_MATCHING | CoercionStyle::TRY_EXACT_MATCH | CoercionStyle::DISALLOW_TYPE_CHANGES;
    let results = coerce_operands(&mut ctx, &[(lhs, lhs_qty), (rhs, rhs_qty)], &[dst_qty, dst_qty], style).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.consider_type_changed));
}

#[test]
fn mismatched_arity_is_rejected_before_any_coercion_runs() {
    let mut ctx = Context::new();
    let bool_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Bool));
    let qty = qualified(&mut ctx, bool_ty, Constness::Const);
    let lhs = ctx.alloc(here(), NodeKind::Expression(Expression::Name { id: "a".into(), scope: None }));

    let style = CoercionStyle::OPERAND_MATCHING | CoercionStyle::TRY_EXACT_MATCH;
    let result = coerce_operands(&mut ctx, &[(lhs, qty)], &[qty, qty], style);
    assert!(result.is_err());
}
