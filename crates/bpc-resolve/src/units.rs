//! Unit/field lowering: `auto` propagation from a literal initializer, and
//! the attribute-only void field compatibility rewrite to `skip bytes`.

use bpc_ast::{Context, Ctor, Declaration, Expression, NodeId, NodeKind, Statement, UnitField, UnitFieldKind, UnqualifiedType};
use bpc_common::diagnostics::{Diagnostic, DiagnosticKind, Priority};
use bpc_common::options::CompilerOptions;

/// Resolves `auto`-typed globals/locals/constants whose initializer is a
/// direct literal, inferring the type from the ctor's shape. This is a
/// narrow heuristic, not a type-inference engine: an `auto` initialized from
/// an expression other than a bare literal is left unresolved and the
/// fixpoint driver will keep retrying it every round without progress,
/// eventually hitting `max_resolver_rounds` if nothing else in the module
/// would otherwise converge. See `DESIGN.md`.
pub fn propagate_auto(ctx: &mut Context, root: NodeId) -> bool {
    let mut changed = false;
    propagate_auto_rec(ctx, root, &mut changed);
    changed
}

fn propagate_auto_rec(ctx: &mut Context, id: NodeId, changed: &mut bool) {
    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        propagate_auto_rec(ctx, child, changed);
    }

    let (ty, init) = match &ctx.node(id).kind {
        NodeKind::Declaration(Declaration::GlobalVariable { ty, init, .. })
        | NodeKind::Declaration(Declaration::LocalVariable { ty, init, .. }) => (*ty, *init),
        _ => return,
    };

    let Some(init) = init else { return };
    if !matches!(ctx.unqualified_type(ty), UnqualifiedType::Auto) {
        return;
    }
    let Some(concrete) = literal_type_of(ctx, init) else { return };

    ctx.node_mut(ty).kind = NodeKind::UnqualifiedType(concrete);
    *changed = true;
}

/// The concrete type implied by a literal ctor, or `None` for anything that
/// is not a bare literal (a name, an operator application, ...).
fn literal_type_of(ctx: &Context, expr: NodeId) -> Option<UnqualifiedType> {
    let ctor = match &ctx.node(expr).kind {
        NodeKind::Expression(Expression::Ctor(ctor)) => *ctor,
        _ => return None,
    };

    match &ctx.node(ctor).kind {
        NodeKind::Ctor(Ctor::Integer(v)) => Some(UnqualifiedType::Integer { width: integer_width_for(*v), signed: *v < 0 }),
        NodeKind::Ctor(Ctor::Bool(_)) => Some(UnqualifiedType::Bool),
        NodeKind::Ctor(Ctor::String(_)) => Some(UnqualifiedType::String),
        NodeKind::Ctor(Ctor::Bytes(_)) => Some(UnqualifiedType::Bytes),
        _ => None,
    }
}

/// Turns an attribute-only field with no classified kind into an explicit
/// `skip bytes` field, the legacy compatibility path. Controlled by
/// `options.allow_implicit_skip_rewrite`: a warning when the rewrite is
/// applied, an error (no rewrite) when it is not.
pub fn rewrite_void_fields(ctx: &mut Context, root: NodeId, options: &CompilerOptions) -> bool {
    let mut changed = false;
    rewrite_void_fields_rec(ctx, root, options, &mut changed);
    changed
}

fn rewrite_void_fields_rec(ctx: &mut Context, id: NodeId, options: &CompilerOptions, changed: &mut bool) {
    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        rewrite_void_fields_rec(ctx, child, options, changed);
    }

    let is_unresolved_void_field = matches!(
        &ctx.node(id).kind,
        NodeKind::Statement(Statement::UnitField(UnitField { kind: UnitFieldKind::Unresolved, name: None, .. }))
    );
    if !is_unresolved_void_field {
        return;
    }

    let location = ctx.node(id).meta.location.clone();
    if !options.allow_implicit_skip_rewrite {
        ctx.diagnostics_mut().push(Diagnostic::error(
            DiagnosticKind::Semantic,
            location,
            "attribute-only field with no type requires an explicit 'skip' (implicit rewrite disabled)",
            Priority::Normal,
        ));
        return;
    }

    ctx.diagnostics_mut().push(Diagnostic::warning(
        DiagnosticKind::Semantic,
        location,
        "attribute-only field with no type is deprecated; write 'skip bytes &size=...' explicitly",
    ));

    if let NodeKind::Statement(Statement::UnitField(field)) = &mut ctx.node_mut(id).kind {
        field.kind = UnitFieldKind::Skip;
    }
    *changed = true;
}

fn integer_width_for(value: i128) -> u8 {
    let magnitude = value.unsigned_abs();
    if magnitude <= u64::from(u32::MAX) {
        32
    } else {
        64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpc_ast::{AttributeSet, DeclarationHeader, Linkage, ID};
    use bpc_common::location::Location;

    fn here() -> Location {
        Location::synthetic("t.bpc")
    }

    #[test]
    fn void_field_rewrites_to_skip_when_allowed() {
        let mut ctx = Context::new();
        let attrs = ctx.alloc(here(), NodeKind::AttributeSet(AttributeSet::default()));
        let field = ctx.alloc(
            here(),
            NodeKind::Statement(Statement::UnitField(UnitField {
                name: None,
                kind: UnitFieldKind::Unresolved,
                attributes: attrs,
                condition: None,
            })),
        );
        ctx.set_root(field);

        let options = CompilerOptions { allow_implicit_skip_rewrite: true, ..CompilerOptions::default() };
        let changed = rewrite_void_fields(&mut ctx, field, &options);
        assert!(changed);
        match &ctx.node(field).kind {
            NodeKind::Statement(Statement::UnitField(f)) => assert!(matches!(f.kind, UnitFieldKind::Skip)),
            _ => panic!("expected unit field"),
        }
    }

    #[test]
    fn void_field_is_rejected_when_rewrite_disabled() {
        let mut ctx = Context::new();
        let attrs = ctx.alloc(here(), NodeKind::AttributeSet(AttributeSet::default()));
        let field = ctx.alloc(
            here(),
            NodeKind::Statement(Statement::UnitField(UnitField {
                name: None,
                kind: UnitFieldKind::Unresolved,
                attributes: attrs,
                condition: None,
            })),
        );
        ctx.set_root(field);

        let options = CompilerOptions { allow_implicit_skip_rewrite: false, ..CompilerOptions::default() };
        let changed = rewrite_void_fields(&mut ctx, field, &options);
        assert!(!changed);
        assert!(ctx.diagnostics().has_errors());
    }

    #[test]
    fn auto_local_with_integer_initializer_resolves() {
        let mut ctx = Context::new();
        let auto_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Auto));
        let ctor = ctx.alloc(here(), NodeKind::Ctor(Ctor::Integer(7)));
        let init = ctx.alloc(here(), NodeKind::Expression(Expression::Ctor(ctor)));
        let decl = ctx.alloc(
            here(),
            NodeKind::Declaration(Declaration::LocalVariable {
                header: DeclarationHeader::new(ID::new("x"), Linkage::Private),
                ty: auto_ty,
                init: Some(init),
            }),
        );
        ctx.append_child(decl, auto_ty);
        ctx.append_child(decl, init);
        ctx.set_root(decl);

        let changed = propagate_auto(&mut ctx, decl);
        assert!(changed);
        assert!(matches!(ctx.unqualified_type(auto_ty), UnqualifiedType::Integer { width: 32, signed: false }));
    }
}
