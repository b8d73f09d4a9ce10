//! End-to-end grammar lowering over small hand-built units, exercising
//! `GrammarPass` the way the resolver hands it a converged module.

use bpc_ast::{
    Context, Declaration, DeclarationHeader, Expression, Linkage, ModuleDecl, ModuleUid, NodeKind, Statement,
    UnitField, UnitFieldKind, UnqualifiedType, ID,
};
use bpc_ast::{AttributeSet, Attribute, Ctor, Pass};
use bpc_common::location::Location;
use bpc_common::options::CompilerOptions;
use bpc_grammar::{GrammarPass, LoopControl, Production};

fn here() -> Location {
    Location::synthetic("t.bpc")
}

fn empty_attrs(ctx: &mut Context) -> bpc_ast::NodeId {
    ctx.alloc(here(), NodeKind::AttributeSet(AttributeSet::default()))
}

fn new_module(ctx: &mut Context) -> bpc_ast::NodeId {
    let module = ctx.alloc(
        here(),
        NodeKind::Declaration(Declaration::Module(ModuleDecl {
            header: DeclarationHeader::new(ID::new("m"), Linkage::Public),
            uid: ModuleUid { id: ID::new("m"), path: None },
            extension: "bpc".into(),
            items: Vec::new(),
        })),
    );
    ctx.set_root(module);
    ctx.register_declaration(module);
    module
}

/// `type T = unit { x: bytes &size=4; };`
#[test]
fn bytes_field_with_size_gets_a_type_production_and_stays_inline() {
    let mut ctx = Context::new();
    let module = new_module(&mut ctx);

    let size_attr = ctx.alloc(
        here(),
        NodeKind::Attribute(Attribute {
            name: "size".into(),
            value: Some(ctx_int_literal(&mut ctx, 4)),
        }),
    );
    let attrs = ctx.alloc(here(), NodeKind::AttributeSet(AttributeSet { attributes: vec![size_attr] }));
    let bytes_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Bytes));
    let field = ctx.alloc(
        here(),
        NodeKind::Statement(Statement::UnitField(UnitField {
            name: Some(ID::new("x")),
            kind: UnitFieldKind::Type(bytes_ty),
            attributes: attrs,
            condition: None,
        })),
    );

    let unit_ty = ctx.alloc(
        here(),
        NodeKind::UnqualifiedType(UnqualifiedType::Unit { items: vec![field], properties: Vec::new(), on_heap: false }),
    );
    let unit_decl = ctx.alloc(
        here(),
        NodeKind::Declaration(Declaration::TypeDecl {
            header: DeclarationHeader::new(ID::new("T"), Linkage::Public),
            ty: unit_ty,
        }),
    );
    let decl_idx = ctx.register_declaration(unit_decl);
    ctx.append_child(module, unit_decl);
    ctx.append_child(unit_decl, unit_ty);
    ctx.append_child(unit_ty, field);
    ctx.append_child(field, attrs);
    ctx.append_child(attrs, size_attr);

    let mut pass = GrammarPass::new(CompilerOptions::for_tests());
    pass.run(&mut ctx, module).unwrap();

    let grammar = &pass.output.grammars[&decl_idx];
    match grammar.get(grammar.root) {
        Production::Sequence(parts) => {
            assert_eq!(parts.len(), 1);
            assert!(matches!(grammar.get(parts[0]), Production::Type(_)));
            let lookahead = pass.output.lookahead.as_ref().unwrap();
            let set = lookahead.first_set(decl_idx, parts[0]);
            assert!(set.map_or(true, |s| s.is_empty()), "a bare Type production has no known terminal");
        }
        _ => panic!("expected a sequence"),
    }

    assert!(
        matches!(ctx.unqualified_type(unit_ty), UnqualifiedType::Unit { on_heap: false, .. }),
        "T is not self-recursive and must stay inline"
    );
}

fn ctx_int_literal(ctx: &mut Context, v: i128) -> bpc_ast::NodeId {
    let ctor = ctx.alloc(here(), NodeKind::Ctor(Ctor::Integer(v)));
    ctx.alloc(here(), NodeKind::Expression(Expression::Ctor(ctor)))
}

/// `type R = unit { n: uint8; xs: R[n]; };`
#[test]
fn self_recursive_unit_gets_a_resolved_indirection_and_on_heap() {
    let mut ctx = Context::new();
    let module = new_module(&mut ctx);

    let u8_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Integer { width: 8, signed: false }));
    let n_attrs = empty_attrs(&mut ctx);
    let n_field = ctx.alloc(
        here(),
        NodeKind::Statement(Statement::UnitField(UnitField {
            name: Some(ID::new("n")),
            kind: UnitFieldKind::Type(u8_ty),
            attributes: n_attrs,
            condition: None,
        })),
    );

    // `xs: R[n]` — a placeholder `UnqualifiedType::Unit` stands in for R's
    // declared type until the self-reference is wired up below.
    let unit_ty = ctx.alloc(
        here(),
        NodeKind::UnqualifiedType(UnqualifiedType::Unit {
            items: Vec::new(),
            properties: Vec::new(),
            on_heap: false,
        }),
    );
    let unit_decl = ctx.alloc(
        here(),
        NodeKind::Declaration(Declaration::TypeDecl {
            header: DeclarationHeader::new(ID::new("R"), Linkage::Public),
            ty: unit_ty,
        }),
    );
    let decl_idx = ctx.register_declaration(unit_decl);

    let self_name_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::ResolvedName(
        ctx.register_type(unit_ty).unwrap(),
    )));
    let count_ref = ctx.alloc(here(), NodeKind::Expression(Expression::Name { id: ID::new("n"), scope: None }));
    let count_attr = ctx.alloc(here(), NodeKind::Attribute(Attribute { name: "count".into(), value: Some(count_ref) }));
    let xs_attrs = ctx.alloc(here(), NodeKind::AttributeSet(AttributeSet { attributes: vec![count_attr] }));
    let vector_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Vector(self_name_ty)));
    let xs_field = ctx.alloc(
        here(),
        NodeKind::Statement(Statement::UnitField(UnitField {
            name: Some(ID::new("xs")),
            kind: UnitFieldKind::Type(vector_ty),
            attributes: xs_attrs,
            condition: None,
        })),
    );

    if let NodeKind::UnqualifiedType(UnqualifiedType::Unit { items, .. }) = &mut ctx.node_mut(unit_ty).kind {
        *items = vec![n_field, xs_field];
    }

    ctx.append_child(module, unit_decl);
    ctx.append_child(unit_decl, unit_ty);
    ctx.append_child(unit_ty, n_field);
    ctx.append_child(unit_ty, xs_field);
    ctx.append_child(xs_field, self_name_ty);

    let self_ref = ctx.alloc(here(), NodeKind::Expression(Expression::ResolvedName(decl_idx)));
    ctx.append_child(xs_field, self_ref);

    let mut pass = GrammarPass::new(CompilerOptions::for_tests());
    pass.run(&mut ctx, module).unwrap();

    assert!(
        matches!(ctx.unqualified_type(unit_ty), UnqualifiedType::Unit { on_heap: true, .. }),
        "R must be tagged on-heap since it is self-recursive"
    );
    assert!(ctx.dependent_declarations(decl_idx).contains(&decl_idx));

    let grammar = &pass.output.grammars[&decl_idx];
    match grammar.get(grammar.root) {
        Production::Sequence(parts) => {
            assert_eq!(parts.len(), 2);
            match grammar.get(parts[1]) {
                Production::Loop { body, control } => {
                    assert!(matches!(control, LoopControl::Count(_)));
                    assert!(matches!(grammar.get(*body), Production::Resolved(r) if *r == decl_idx));
                }
                other => panic!("expected xs to lower to a Loop, got {other:?}"),
            }
        }
        _ => panic!("expected a sequence"),
    }
}

/// `type U = unit { switch (self.tag) { 1 -> a: uint8; 1 -> b: uint8; default -> c: uint8; default -> d: uint8; } };`
#[test]
fn switch_with_duplicate_case_and_double_default_raises_exactly_two_errors() {
    let mut ctx = Context::new();
    let module = new_module(&mut ctx);

    let field = |ctx: &mut Context, name: &str| {
        let ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Integer { width: 8, signed: false }));
        let attrs = empty_attrs(ctx);
        ctx.alloc(
            here(),
            NodeKind::Statement(Statement::UnitField(UnitField {
                name: Some(ID::new(name)),
                kind: UnitFieldKind::Type(ty),
                attributes: attrs,
                condition: None,
            })),
        )
    };
    let value = |ctx: &mut Context, v: i128| {
        let ctor = ctx.alloc(here(), NodeKind::Ctor(Ctor::Integer(v)));
        ctx.alloc(here(), NodeKind::Expression(Expression::Ctor(ctor)))
    };

    let a = field(&mut ctx, "a");
    let b = field(&mut ctx, "b");
    let c = field(&mut ctx, "c");
    let d = field(&mut ctx, "d");
    let one_a = value(&mut ctx, 1);
    let one_b = value(&mut ctx, 1);

    let discriminant = ctx.alloc(here(), NodeKind::Expression(Expression::Name { id: ID::new("tag"), scope: None }));
    let attrs = empty_attrs(&mut ctx);
    let switch_field = ctx.alloc(
        here(),
        NodeKind::Statement(Statement::UnitField(UnitField {
            name: None,
            kind: UnitFieldKind::Switch {
                discriminant,
                cases: vec![
                    bpc_ast::SwitchCase { values: Some(vec![one_a]), body: a },
                    bpc_ast::SwitchCase { values: Some(vec![one_b]), body: b },
                    bpc_ast::SwitchCase { values: None, body: c },
                    bpc_ast::SwitchCase { values: None, body: d },
                ],
            },
            attributes: attrs,
            condition: None,
        })),
    );

    let unit_ty = ctx.alloc(
        here(),
        NodeKind::UnqualifiedType(UnqualifiedType::Unit {
            items: vec![switch_field],
            properties: Vec::new(),
            on_heap: false,
        }),
    );
    let unit_decl = ctx.alloc(
        here(),
        NodeKind::Declaration(Declaration::TypeDecl {
            header: DeclarationHeader::new(ID::new("U"), Linkage::Public),
            ty: unit_ty,
        }),
    );
    ctx.register_declaration(unit_decl);
    ctx.append_child(module, unit_decl);
    ctx.append_child(unit_decl, unit_ty);
    ctx.append_child(unit_ty, switch_field);

    let mut pass = GrammarPass::new(CompilerOptions::for_tests());
    pass.run(&mut ctx, module).unwrap();

    let grammar_errors: Vec<_> = ctx
        .diagnostics()
        .iter()
        .filter(|d| d.kind == bpc_common::diagnostics::DiagnosticKind::Grammar)
        .collect();
    assert_eq!(grammar_errors.len(), 2);
}
