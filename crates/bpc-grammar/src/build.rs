//! Builds a unit's [`Grammar`] from its already-resolved field list.
//!
//! Each `Statement::UnitField` becomes one production, recursively for
//! nested `Sequence`/`Switch` bodies. Structural violations that don't
//! depend on look-ahead (duplicate switch case, more than one `default`)
//! are caught here, since they only need the case list, not the fixpoint.

use bpc_ast::{
    AttributeSet, Context, Ctor, DeclarationIndex, Expression, NodeId, NodeKind, Statement, UnitField, UnitFieldKind,
    UnqualifiedType,
};
use bpc_common::diagnostics::{Diagnostic, DiagnosticKind, Priority};
use rustc_hash::FxHashSet;

use crate::production::{Grammar, LoopControl, Production, ProductionId, SwitchArm};

/// Looks up an attribute by name within an `AttributeSet` node. Duplicated
/// from `bpc-resolve`'s helper of the same shape rather than taking a
/// cross-crate dependency for one lookup.
fn find_attribute<'c>(ctx: &'c Context, attribute_set: NodeId, name: &str) -> Option<&'c bpc_ast::Attribute> {
    let AttributeSet { attributes } = match &ctx.node(attribute_set).kind {
        NodeKind::AttributeSet(set) => set,
        _ => return None,
    };
    attributes.iter().find_map(|&id| match &ctx.node(id).kind {
        NodeKind::Attribute(a) if a.name == name => Some(a),
        _ => None,
    })
}

/// The unit's own declared type resolves, directly or through one layer of
/// reference/container wrapping, to `target`. Used both to recognize
/// self-recursive fields (wrap in `Resolved` instead of `Type`) and to size
/// loop bodies for count-bearing container fields.
fn resolved_type_target(ctx: &Context, ty: NodeId) -> Option<NodeId> {
    match ctx.unqualified_type(ty) {
        UnqualifiedType::ResolvedName(idx) => Some(ctx.lookup_type(*idx)),
        UnqualifiedType::StrongRef(inner)
        | UnqualifiedType::WeakRef(inner)
        | UnqualifiedType::ValueRef(inner)
        | UnqualifiedType::Vector(inner)
        | UnqualifiedType::List(inner)
        | UnqualifiedType::Set(inner) => resolved_type_target(ctx, *inner),
        _ => None,
    }
}

fn is_container_type(ctx: &Context, ty: NodeId) -> bool {
    matches!(
        ctx.unqualified_type(ty),
        UnqualifiedType::Vector(_) | UnqualifiedType::List(_) | UnqualifiedType::Set(_)
    )
}

/// Builds the grammar for the unit type declared by `unit_decl`, whose
/// declared type must be `UnqualifiedType::Unit`. Diagnostics for
/// structural switch errors are pushed onto `ctx`'s diagnostic set as a
/// side effect.
pub fn build_grammar(ctx: &mut Context, unit_decl: DeclarationIndex, unit_ty: NodeId, items: &[NodeId]) -> Grammar {
    let mut grammar = Grammar::new(unit_decl);
    let root = build_sequence(ctx, &mut grammar, unit_decl, unit_ty, items);
    grammar.set_root(root);
    grammar
}

fn build_sequence(
    ctx: &mut Context,
    grammar: &mut Grammar,
    unit_decl: DeclarationIndex,
    unit_ty: NodeId,
    items: &[NodeId],
) -> ProductionId {
    let parts: Vec<ProductionId> = items
        .iter()
        .map(|&item| build_field(ctx, grammar, unit_decl, unit_ty, item))
        .collect();
    grammar.alloc(Production::Sequence(parts))
}

fn build_field(
    ctx: &mut Context,
    grammar: &mut Grammar,
    unit_decl: DeclarationIndex,
    unit_ty: NodeId,
    field_id: NodeId,
) -> ProductionId {
    let field = match &ctx.node(field_id).kind {
        NodeKind::Statement(Statement::UnitField(f)) => f.clone(),
        _ => return grammar.alloc(Production::Sequence(Vec::new())),
    };
    let UnitField { kind, attributes, .. } = field;

    match kind {
        UnitFieldKind::Ctor(ctor) => grammar.alloc(Production::Ctor(ctor)),
        UnitFieldKind::Type(ty) => build_typed_field(ctx, grammar, unit_decl, unit_ty, ty, attributes),
        UnitFieldKind::Sequence(sub_items) => build_sequence(ctx, grammar, unit_decl, unit_ty, &sub_items),
        UnitFieldKind::Switch { discriminant, cases } => {
            build_switch(ctx, grammar, unit_decl, unit_ty, field_id, discriminant, cases)
        }
        UnitFieldKind::Skip => grammar.alloc(Production::Sequence(Vec::new())),
        UnitFieldKind::Unresolved => {
            ctx.diagnostics_mut().push(Diagnostic::error(
                DiagnosticKind::Semantic,
                ctx.node(field_id).meta.location.clone(),
                "field reached grammar construction without being classified",
                Priority::Normal,
            ));
            grammar.alloc(Production::Sequence(Vec::new()))
        }
    }
}

fn build_typed_field(
    ctx: &mut Context,
    grammar: &mut Grammar,
    unit_decl: DeclarationIndex,
    unit_ty: NodeId,
    ty: NodeId,
    attributes: NodeId,
) -> ProductionId {
    if is_container_type(ctx, ty) {
        let body = build_element(ctx, grammar, unit_decl, unit_ty, ty);
        let control = if let Some(count) = find_attribute(ctx, attributes, "count").and_then(|a| a.value) {
            LoopControl::Count(count)
        } else if let Some(cond) = find_attribute(ctx, attributes, "while").and_then(|a| a.value) {
            LoopControl::While(cond)
        } else {
            LoopControl::Unbounded
        };
        return grammar.alloc(Production::Loop { body, control });
    }

    build_element(ctx, grammar, unit_decl, unit_ty, ty)
}

/// A field's type minus any `&count`/`&while` container wrapping already
/// handled by the caller: either a recursive reference back to the
/// enclosing unit, or a plain sub-parser.
fn build_element(ctx: &Context, grammar: &mut Grammar, unit_decl: DeclarationIndex, unit_ty: NodeId, ty: NodeId) -> ProductionId {
    if let Some(target) = resolved_type_target(ctx, ty) {
        if target == unit_ty {
            return grammar.alloc(Production::Resolved(unit_decl));
        }
    }
    grammar.alloc(Production::Type(ty))
}

fn build_switch(
    ctx: &mut Context,
    grammar: &mut Grammar,
    unit_decl: DeclarationIndex,
    unit_ty: NodeId,
    field_id: NodeId,
    discriminant: NodeId,
    cases: Vec<bpc_ast::SwitchCase>,
) -> ProductionId {
    let mut seen_values: FxHashSet<i128> = FxHashSet::default();
    let mut default_count = 0usize;
    let location = ctx.node(field_id).meta.location.clone();

    let mut arms = Vec::with_capacity(cases.len());
    for case in cases {
        match &case.values {
            None => {
                default_count += 1;
                if default_count > 1 {
                    ctx.diagnostics_mut().push(Diagnostic::error(
                        DiagnosticKind::Grammar,
                        location.clone(),
                        "switch has more than one default case",
                        Priority::Normal,
                    ));
                }
            }
            Some(values) => {
                for &value_node in values {
                    if let Some(v) = integer_value_of(ctx, value_node) {
                        if !seen_values.insert(v) {
                            ctx.diagnostics_mut().push(Diagnostic::error(
                                DiagnosticKind::Grammar,
                                location.clone(),
                                format!("duplicate switch case {v}"),
                                Priority::Normal,
                            ));
                        }
                    }
                }
            }
        }

        let body = build_field(ctx, grammar, unit_decl, unit_ty, case.body);
        arms.push(SwitchArm { values: case.values, body });
    }

    grammar.alloc(Production::Switch { discriminant, arms })
}

fn integer_value_of(ctx: &Context, expr: NodeId) -> Option<i128> {
    match &ctx.node(expr).kind {
        NodeKind::Expression(Expression::Ctor(ctor)) => match &ctx.node(*ctor).kind {
            NodeKind::Ctor(Ctor::Integer(v)) => Some(*v),
            _ => None,
        },
        _ => None,
    }
}
