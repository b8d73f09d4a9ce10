//! Hook linking: normalizing a hook's name to carry its leading `%`, binding
//! `Hook.unit` to the nearest enclosing unit type declaration, and resolving
//! externally-declared hooks (`on Greeting::%done { ... }`, written outside
//! any unit body) against the module's declared units.

use bpc_ast::{
    Context, Declaration, DeclarationHeader, Function, Hook, Linkage, NodeId, NodeKind, ParameterKind, Statement,
    UnitField, UnitFieldKind, UnqualifiedType, ID,
};
use bpc_common::diagnostics::{Diagnostic, DiagnosticKind, Priority};

/// Walks every `Hook` reachable from `root`, normalizing its name and
/// setting `unit` from the nearest enclosing `Unit`-typed `TypeDecl`, or —
/// for a hook with no enclosing unit — by resolving its written `unit_name`
/// against the module's declared units. A hook with neither an enclosing
/// unit nor a written unit name is a `Normal`-priority diagnostic rather
/// than left silently unlinked.
pub fn link_hooks(ctx: &mut Context, root: NodeId) -> bool {
    let mut changed = false;
    link_hooks_rec(ctx, root, root, None, &mut changed);
    changed
}

fn link_hooks_rec(ctx: &mut Context, root: NodeId, id: NodeId, enclosing_unit: Option<NodeId>, changed: &mut bool) {
    let next_enclosing = if is_unit_type_decl(ctx, id) { Some(id) } else { enclosing_unit };

    if let NodeKind::Hook(_) = &ctx.node(id).kind {
        link_one_hook(ctx, root, id, next_enclosing, changed);
    }

    let children: smallvec::SmallVec<[NodeId; 4]> = ctx.node(id).children.clone();
    for child in children {
        link_hooks_rec(ctx, root, child, next_enclosing, changed);
    }
}

fn is_unit_type_decl(ctx: &Context, id: NodeId) -> bool {
    match &ctx.node(id).kind {
        NodeKind::Declaration(Declaration::TypeDecl { ty, .. }) => {
            matches!(ctx.unqualified_type(*ty), UnqualifiedType::Unit { .. })
        }
        _ => false,
    }
}

/// Finds a `TypeDecl` unit declared anywhere under `root` whose name matches
/// `name` exactly. A linear walk, same as `bpc-grammar::collect_units` — this
/// workspace has no cross-module import resolution to route through.
fn find_unit_by_name(ctx: &Context, root: NodeId, name: &ID) -> Option<NodeId> {
    if is_unit_type_decl(ctx, root) {
        if let NodeKind::Declaration(Declaration::TypeDecl { header, .. }) = &ctx.node(root).kind {
            if &header.id == name {
                return Some(root);
            }
        }
    }
    for child in ctx.node(root).children.clone() {
        if let Some(found) = find_unit_by_name(ctx, child, name) {
            return Some(found);
        }
    }
    None
}

fn link_one_hook(ctx: &mut Context, root: NodeId, id: NodeId, enclosing_unit: Option<NodeId>, changed: &mut bool) {
    let (name, unit_name, unit, field, function) = match &ctx.node(id).kind {
        NodeKind::Hook(Hook { name, unit_name, unit, field, function }) => {
            (name.clone(), unit_name.clone(), *unit, field.clone(), *function)
        }
        _ => return,
    };

    let normalized = normalize_hook_name(&name);
    if normalized != name {
        if let NodeKind::Hook(hook) = &mut ctx.node_mut(id).kind {
            hook.name = normalized.clone();
        }
        *changed = true;
    }

    let mut linked_unit = unit;
    if unit.is_none() {
        if let Some(unit_decl) = enclosing_unit {
            let unit_idx = ctx.register_declaration(unit_decl);
            if let NodeKind::Hook(hook) = &mut ctx.node_mut(id).kind {
                hook.unit = Some(unit_idx);
            }
            linked_unit = Some(unit_idx);
            *changed = true;
        } else if let Some(target_name) = &unit_name {
            match find_unit_by_name(ctx, root, target_name) {
                Some(unit_decl) => {
                    let unit_idx = ctx.register_declaration(unit_decl);
                    if let NodeKind::Hook(hook) = &mut ctx.node_mut(id).kind {
                        hook.unit = Some(unit_idx);
                    }
                    linked_unit = Some(unit_idx);
                    *changed = true;
                }
                None => {
                    let location = ctx.node(id).meta.location.clone();
                    ctx.diagnostics_mut().push(Diagnostic::error(
                        DiagnosticKind::Lookup,
                        location,
                        format!("unresolved name '{}' in hook namespace", target_name.as_str()),
                        Priority::High,
                    ));
                }
            }
        } else {
            let location = ctx.node(id).meta.location.clone();
            ctx.diagnostics_mut().push(Diagnostic::error(
                DiagnosticKind::Semantic,
                location,
                format!("hook '{normalized}' is not declared inside a unit"),
                Priority::Normal,
            ));
        }
    }

    if normalized == "%print" {
        ensure_print_result_type(ctx, function, changed);
    } else if normalized == "%error" {
        ensure_error_parameter(ctx, function, changed);
    }

    if let (Some(field_name), Some(unit_idx)) = (&field, linked_unit) {
        if let Some(field_ty) = resolved_field_type(ctx, unit_idx, field_name) {
            ensure_dollar_dollar_parameter(ctx, function, field_ty, changed);
        }
    }
}

/// `on Unit` (no explicit hook suffix) defaults to `%done`; otherwise a bare
/// name just gains its leading `%`.
fn normalize_hook_name(name: &str) -> String {
    if name.is_empty() {
        "%done".to_string()
    } else if name.starts_with('%') {
        name.to_string()
    } else {
        format!("%{name}")
    }
}

fn resolved_field_type(ctx: &Context, unit_idx: bpc_ast::DeclarationIndex, field_name: &ID) -> Option<NodeId> {
    let unit_decl = ctx.lookup_declaration(unit_idx);
    let unit_ty = ctx.declaration(unit_decl).declared_type()?;
    let items = match ctx.unqualified_type(unit_ty) {
        UnqualifiedType::Unit { items, .. } => items.clone(),
        _ => return None,
    };
    for item in items {
        if let NodeKind::Statement(Statement::UnitField(UnitField { name: Some(n), kind, .. })) = &ctx.node(item).kind
        {
            if n == field_name {
                return match kind {
                    UnitFieldKind::Type(ty) => Some(*ty),
                    _ => None,
                };
            }
        }
    }
    None
}

fn is_optional_of(ctx: &Context, ty: NodeId, inner_is: impl Fn(&UnqualifiedType) -> bool) -> bool {
    matches!(ctx.unqualified_type(ty), UnqualifiedType::Optional(inner) if inner_is(ctx.unqualified_type(*inner)))
}

/// `%print` always returns `optional<string>`, overriding whatever the
/// source declared.
fn ensure_print_result_type(ctx: &mut Context, function: NodeId, changed: &mut bool) {
    let current = match &ctx.node(function).kind {
        NodeKind::Function(Function { result, .. }) => *result,
        _ => return,
    };
    if is_optional_of(ctx, current, |t| matches!(t, UnqualifiedType::String)) {
        return;
    }

    let location = ctx.node(function).meta.location.clone();
    let string_ty = ctx.alloc(location.clone(), NodeKind::UnqualifiedType(UnqualifiedType::String));
    let optional_ty = ctx.alloc(location, NodeKind::UnqualifiedType(UnqualifiedType::Optional(string_ty)));
    if let NodeKind::Function(f) = &mut ctx.node_mut(function).kind {
        f.result = optional_ty;
    }
    ctx.append_child(function, optional_ty);
    *changed = true;
}

/// `%error` always takes a single `optional<string>` parameter, overriding
/// whatever parameter list the source declared.
fn ensure_error_parameter(ctx: &mut Context, function: NodeId, changed: &mut bool) {
    let parameters = match &ctx.node(function).kind {
        NodeKind::Function(Function { parameters, .. }) => parameters.clone(),
        _ => return,
    };
    if parameters.len() == 1 && is_error_parameter(ctx, parameters[0]) {
        return;
    }

    let location = ctx.node(function).meta.location.clone();
    let string_ty = ctx.alloc(location.clone(), NodeKind::UnqualifiedType(UnqualifiedType::String));
    let optional_ty = ctx.alloc(location.clone(), NodeKind::UnqualifiedType(UnqualifiedType::Optional(string_ty)));
    let param = ctx.alloc(
        location,
        NodeKind::Declaration(Declaration::Parameter {
            header: DeclarationHeader::new(ID::new("msg"), Linkage::Private),
            ty: optional_ty,
            kind: ParameterKind::In,
        }),
    );
    ctx.register_declaration(param);
    if let NodeKind::Function(f) = &mut ctx.node_mut(function).kind {
        f.parameters = vec![param];
    }
    ctx.append_child(function, optional_ty);
    ctx.append_child(function, param);
    *changed = true;
}

fn is_error_parameter(ctx: &Context, param: NodeId) -> bool {
    match &ctx.node(param).kind {
        NodeKind::Declaration(Declaration::Parameter { ty, .. }) => {
            is_optional_of(ctx, *ty, |t| matches!(t, UnqualifiedType::String))
        }
        _ => false,
    }
}

/// Prepends an implicit `$$` parameter carrying the containing field's type,
/// so a per-field hook body can refer to the value just parsed.
fn ensure_dollar_dollar_parameter(ctx: &mut Context, function: NodeId, field_ty: NodeId, changed: &mut bool) {
    let already_has = match &ctx.node(function).kind {
        NodeKind::Function(Function { parameters, .. }) => parameters.first().is_some_and(|&p| is_dollar_dollar(ctx, p)),
        _ => return,
    };
    if already_has {
        return;
    }

    let location = ctx.node(function).meta.location.clone();
    let param = ctx.alloc(
        location,
        NodeKind::Declaration(Declaration::Parameter {
            header: DeclarationHeader::new(ID::new("$$"), Linkage::Private),
            ty: field_ty,
            kind: ParameterKind::In,
        }),
    );
    ctx.register_declaration(param);
    if let NodeKind::Function(f) = &mut ctx.node_mut(function).kind {
        f.parameters.insert(0, param);
    }
    ctx.append_child(function, param);
    *changed = true;
}

fn is_dollar_dollar(ctx: &Context, param: NodeId) -> bool {
    matches!(
        &ctx.node(param).kind,
        NodeKind::Declaration(Declaration::Parameter { header, .. }) if header.id.as_str() == "$$"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpc_common::diagnostics::DiagnosticKind;
    use bpc_common::location::Location;

    fn here() -> Location {
        Location::synthetic("t.bpc")
    }

    fn unit_decl(ctx: &mut Context, name: &str) -> (NodeId, NodeId) {
        let unit_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Unit { items: Vec::new(), properties: Vec::new(), on_heap: false }));
        let decl = ctx.alloc(
            here(),
            NodeKind::Declaration(Declaration::TypeDecl {
                header: DeclarationHeader::new(ID::new(name), Linkage::Public),
                ty: unit_ty,
            }),
        );
        ctx.append_child(decl, unit_ty);
        (decl, unit_ty)
    }

    fn hook_node(ctx: &mut Context, name: &str) -> NodeId {
        hook_node_external(ctx, name, None)
    }

    fn hook_node_external(ctx: &mut Context, name: &str, unit_name: Option<&str>) -> NodeId {
        let result_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Void));
        let function = ctx.alloc(here(), NodeKind::Function(Function { parameters: Vec::new(), result: result_ty, body: None }));
        ctx.alloc(
            here(),
            NodeKind::Hook(Hook {
                unit: None,
                unit_name: unit_name.map(ID::new),
                field: None,
                name: name.into(),
                function,
            }),
        )
    }

    #[test]
    fn hook_name_gains_a_leading_percent() {
        let mut ctx = Context::new();
        let (unit, unit_ty) = unit_decl(&mut ctx, "Packet");
        let hook = hook_node(&mut ctx, "init");
        ctx.append_child(unit_ty, hook);
        ctx.set_root(unit);

        link_hooks(&mut ctx, unit);
        match &ctx.node(hook).kind {
            NodeKind::Hook(h) => assert_eq!(h.name, "%init"),
            _ => panic!("expected hook"),
        }
    }

    #[test]
    fn bare_on_unit_defaults_to_percent_done() {
        let mut ctx = Context::new();
        let (unit, unit_ty) = unit_decl(&mut ctx, "Packet");
        let hook = hook_node(&mut ctx, "");
        ctx.append_child(unit_ty, hook);
        ctx.set_root(unit);

        link_hooks(&mut ctx, unit);
        match &ctx.node(hook).kind {
            NodeKind::Hook(h) => assert_eq!(h.name, "%done"),
            _ => panic!("expected hook"),
        }
    }

    #[test]
    fn hook_links_to_nearest_enclosing_unit() {
        let mut ctx = Context::new();
        let (unit, unit_ty) = unit_decl(&mut ctx, "Packet");
        let hook = hook_node(&mut ctx, "%done");
        ctx.append_child(unit_ty, hook);
        ctx.set_root(unit);

        let unit_idx = ctx.register_declaration(unit);
        link_hooks(&mut ctx, unit);

        match &ctx.node(hook).kind {
            NodeKind::Hook(h) => assert_eq!(h.unit, Some(unit_idx)),
            _ => panic!("expected hook"),
        }
    }

    #[test]
    fn hook_outside_any_unit_is_an_error() {
        let mut ctx = Context::new();
        let hook = hook_node(&mut ctx, "%init");
        ctx.set_root(hook);

        link_hooks(&mut ctx, hook);
        assert!(ctx.diagnostics().has_errors());
    }

    /// `on Greeting::%done { ... }` where `Greeting` is declared elsewhere in
    /// the module resolves `unit` without any enclosing unit node.
    #[test]
    fn external_hook_resolves_against_a_declared_unit() {
        let mut ctx = Context::new();
        let (unit, _unit_ty) = unit_decl(&mut ctx, "Greeting");
        let unit_idx = ctx.register_declaration(unit);

        let hook = hook_node_external(&mut ctx, "%done", Some("Greeting"));
        let module = ctx.alloc(here(), NodeKind::Statement(Statement::Block(vec![unit, hook])));
        ctx.append_child(module, unit);
        ctx.append_child(module, hook);
        ctx.set_root(module);

        link_hooks(&mut ctx, module);
        match &ctx.node(hook).kind {
            NodeKind::Hook(h) => assert_eq!(h.unit, Some(unit_idx)),
            _ => panic!("expected hook"),
        }
    }

    /// `on Greeting::%done { print self.hello; }` with `Greeting` undefined
    /// → unresolved-name error at priority High on the hook's namespace.
    #[test]
    fn external_hook_with_undefined_unit_raises_high_priority_lookup_error() {
        let mut ctx = Context::new();
        let hook = hook_node_external(&mut ctx, "%done", Some("Greeting"));
        ctx.set_root(hook);

        link_hooks(&mut ctx, hook);
        let found = ctx
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::Lookup && d.priority == Priority::High);
        assert!(found, "expected a High-priority Lookup diagnostic, got: {:?}", ctx.diagnostics().iter().collect::<Vec<_>>());
    }

    #[test]
    fn percent_print_hook_gets_an_optional_string_result() {
        let mut ctx = Context::new();
        let (unit, unit_ty) = unit_decl(&mut ctx, "Packet");
        let hook = hook_node(&mut ctx, "%print");
        ctx.append_child(unit_ty, hook);
        ctx.set_root(unit);

        link_hooks(&mut ctx, unit);
        let function = match &ctx.node(hook).kind {
            NodeKind::Hook(h) => h.function,
            _ => panic!("expected hook"),
        };
        let result = match &ctx.node(function).kind {
            NodeKind::Function(f) => f.result,
            _ => panic!("expected function"),
        };
        assert!(is_optional_of(&ctx, result, |t| matches!(t, UnqualifiedType::String)));
    }

    #[test]
    fn percent_error_hook_gets_an_optional_string_parameter() {
        let mut ctx = Context::new();
        let (unit, unit_ty) = unit_decl(&mut ctx, "Packet");
        let hook = hook_node(&mut ctx, "%error");
        ctx.append_child(unit_ty, hook);
        ctx.set_root(unit);

        link_hooks(&mut ctx, unit);
        let function = match &ctx.node(hook).kind {
            NodeKind::Hook(h) => h.function,
            _ => panic!("expected hook"),
        };
        match &ctx.node(function).kind {
            NodeKind::Function(f) => {
                assert_eq!(f.parameters.len(), 1);
                assert!(is_error_parameter(&ctx, f.parameters[0]));
            }
            _ => panic!("expected function"),
        }
    }
}
