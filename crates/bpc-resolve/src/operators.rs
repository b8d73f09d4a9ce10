//! Operator overload resolution: matching an `UnresolvedOperator`'s operand
//! list against the registered candidate signatures for its `OperatorKind`,
//! via the coercion engine's `coerce_operands`.

use bpc_ast::{Context, Expression, NodeId, NodeKind, Operator, OperatorKind};
use bpc_common::diagnostics::{Diagnostic, DiagnosticKind, Priority};
use bpc_coerce::{coerce_operands, CoerceError, CoercionStyle};
use rustc_hash::FxHashMap;

/// Candidate `Operator` node ids, keyed by `(kind, arity)`. Populated once
/// per resolver round by scanning the tree for `NodeKind::Operator` nodes;
/// cheap enough given how few distinct operator signatures a module defines.
#[derive(Default)]
pub struct OperatorRegistry {
    candidates: FxHashMap<(OperatorKind, usize), Vec<NodeId>>,
}

impl OperatorRegistry {
    pub fn rebuild(&mut self, ctx: &Context, root: NodeId) {
        self.candidates.clear();
        collect_operators(ctx, root, &mut self.candidates);
    }

    #[must_use]
    fn candidates_for(&self, kind: OperatorKind, arity: usize) -> &[NodeId] {
        self.candidates.get(&(kind, arity)).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn collect_operators(ctx: &Context, id: NodeId, out: &mut FxHashMap<(OperatorKind, usize), Vec<NodeId>>) {
    if let NodeKind::Operator(op) = &ctx.node(id).kind {
        out.entry((op.kind, op.operands.len())).or_default().push(id);
    }
    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        collect_operators(ctx, child, out);
    }
}

const MATCH_STYLE: CoercionStyle = CoercionStyle::from_bits_truncate(
    CoercionStyle::OPERAND_MATCHING.bits()
        | CoercionStyle::TRY_EXACT_MATCH.bits()
        | CoercionStyle::TRY_CONST_PROMOTION.bits()
        | CoercionStyle::TRY_COERCION.bits()
        | CoercionStyle::DISALLOW_TYPE_CHANGES.bits(),
);

/// Rewrites every `Expression::UnresolvedOperator` reachable from `root`
/// into a `ResolvedOperator` against the first candidate signature whose
/// operand list `coerce_operands` accepts. No candidate accepting the
/// operands is a `High`-priority diagnostic, not a panic: an unresolved
/// operator is an ordinary user-facing error (wrong argument types), never
/// an invariant violation.
pub fn instantiate_operators(ctx: &mut Context, root: NodeId, registry: &OperatorRegistry) -> bool {
    let mut changed = false;
    instantiate_rec(ctx, root, registry, &mut changed);
    changed
}

fn instantiate_rec(ctx: &mut Context, id: NodeId, registry: &OperatorRegistry, changed: &mut bool) {
    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        instantiate_rec(ctx, child, registry, changed);
    }

    let (kind, operands) = match &ctx.node(id).kind {
        NodeKind::Expression(Expression::UnresolvedOperator { kind, operands }) => (*kind, operands.clone()),
        _ => return,
    };

    let mut last_error: Option<CoerceError> = None;
    for &candidate in registry.candidates_for(kind, operands.len()) {
        let Operator { operands: params, .. } = match &ctx.node(candidate).kind {
            NodeKind::Operator(op) => op.clone(),
            _ => continue,
        };

        let operand_pairs: Option<Vec<(NodeId, NodeId)>> = operands
            .iter()
            .map(|&expr| operand_qualified_type(ctx, expr).map(|qty| (expr, qty)))
            .collect();
        let Some(operand_pairs) = operand_pairs else {
            continue;
        };

        match coerce_operands(ctx, &operand_pairs, &params, MATCH_STYLE) {
            Ok(coerced) => {
                let new_operands: Vec<NodeId> = coerced.iter().map(|c| c.coerced_node).collect();
                let parent = ctx.node(id).parent;
                let location = ctx.node(id).meta.location.clone();
                let resolved = ctx.alloc(
                    location,
                    NodeKind::Expression(Expression::ResolvedOperator {
                        operator: candidate,
                        operands: new_operands,
                    }),
                );
                if let Some(parent) = parent {
                    ctx.replace_child(parent, id, resolved);
                    *changed = true;
                }
                return;
            }
            Err(e) => last_error = Some(e),
        }
    }

    if registry.candidates_for(kind, operands.len()).is_empty() || last_error.is_some() {
        let location = ctx.node(id).meta.location.clone();
        let message = match last_error {
            Some(e) => format!("no overload of {kind:?} accepts these operands: {e}"),
            None => format!("no operator signature registered for {kind:?}/{}", operands.len()),
        };
        ctx.diagnostics_mut()
            .push(Diagnostic::error(DiagnosticKind::TypeMismatch, location, message, Priority::Normal));
    }
}

/// An operand's type node, for passing to `coerce_operands`. Only a
/// `ResolvedName` operand has a declared type available without a full
/// expression-typing pass; other operand shapes are left for a future
/// widening of this resolver (see `DESIGN.md`).
fn operand_qualified_type(ctx: &Context, expr: NodeId) -> Option<NodeId> {
    match &ctx.node(expr).kind {
        Expression::ResolvedName(idx) => ctx.declaration(ctx.lookup_declaration(*idx)).declared_type(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpc_ast::{Constness, Declaration, DeclarationHeader, Linkage, QualifiedType, UnqualifiedType, ID};
    use bpc_common::location::Location;

    fn here() -> Location {
        Location::synthetic("t.bpc")
    }

    fn qualified(ctx: &mut Context, ty: NodeId, constness: Constness) -> NodeId {
        ctx.alloc(here(), NodeKind::QualifiedType(QualifiedType { ty, constness, is_alias: false }))
    }

    #[test]
    fn resolves_against_the_only_matching_arity_candidate() {
        let mut ctx = Context::new();
        let bool_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Bool));
        let lhs_qty = qualified(&mut ctx, bool_ty, Constness::Const);
        let rhs_qty = qualified(&mut ctx, bool_ty, Constness::Const);

        let operator = ctx.alloc(
            here(),
            NodeKind::Operator(Operator {
                kind: OperatorKind::LogicalAnd,
                operands: vec![lhs_qty, rhs_qty],
                result: bool_ty,
            }),
        );

        let lhs_decl = ctx.alloc(
            here(),
            NodeKind::Declaration(Declaration::GlobalVariable {
                header: DeclarationHeader::new(ID::new("a"), Linkage::Public),
                ty: lhs_qty,
                init: None,
            }),
        );
        let lhs_idx = ctx.register_declaration(lhs_decl);
        let rhs_decl = ctx.alloc(
            here(),
            NodeKind::Declaration(Declaration::GlobalVariable {
                header: DeclarationHeader::new(ID::new("b"), Linkage::Public),
                ty: rhs_qty,
                init: None,
            }),
        );
        let rhs_idx = ctx.register_declaration(rhs_decl);

        let lhs = ctx.alloc(here(), NodeKind::Expression(Expression::ResolvedName(lhs_idx)));
        let rhs = ctx.alloc(here(), NodeKind::Expression(Expression::ResolvedName(rhs_idx)));
        let unresolved = ctx.alloc(
            here(),
            NodeKind::Expression(Expression::UnresolvedOperator {
                kind: OperatorKind::LogicalAnd,
                operands: vec![lhs, rhs],
            }),
        );
        let stmt = ctx.alloc(here(), NodeKind::Statement(bpc_ast::Statement::ExprStatement(unresolved)));
        ctx.append_child(stmt, unresolved);
        ctx.set_root(stmt);

        ctx.append_child(stmt, operator);
        let mut registry = OperatorRegistry::default();
        registry.rebuild(&ctx, stmt);

        let changed = instantiate_operators(&mut ctx, stmt, &registry);
        assert!(changed);
        let resolved = ctx.node(stmt).children[0];
        assert!(matches!(&ctx.node(resolved).kind, NodeKind::Expression(Expression::ResolvedOperator { .. })));
    }
}
