//! The `Resolver`: one `Pass` implementation plugged into
//! `Context::process_ast`'s fixpoint loop, running every sub-stage each
//! round until nothing changes.

use bpc_ast::{Context, InternalError, NodeId, Pass, ScopeId, TypeIndex};
use bpc_common::options::CompilerOptions;
use rustc_hash::FxHashMap;

use crate::attributes::{coerce_size_attributes, rewrite_requires_conditions};
use crate::hooks::link_hooks;
use crate::names::{resolve_names, resolve_type_names};
use crate::operators::{instantiate_operators, OperatorRegistry};
use crate::scope_builder::build_scopes;
use crate::units::{propagate_auto, rewrite_void_fields};

/// Persists the caches that only need rebuilding once per round (scopes,
/// the type-index map, the operator registry) across the fixpoint driver's
/// repeated calls to `run`.
pub struct Resolver {
    options: CompilerOptions,
    type_index_of: FxHashMap<NodeId, TypeIndex>,
    node_scope: FxHashMap<NodeId, ScopeId>,
    operators: OperatorRegistry,
}

impl Resolver {
    #[must_use]
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            type_index_of: FxHashMap::default(),
            node_scope: FxHashMap::default(),
            operators: OperatorRegistry::default(),
        }
    }
}

impl Pass for Resolver {
    fn run(&mut self, ctx: &mut Context, root: NodeId) -> Result<bool, InternalError> {
        self.type_index_of.clear();
        self.node_scope.clear();
        build_scopes(ctx, root, &mut self.type_index_of, &mut self.node_scope);
        self.operators.rebuild(ctx, root);

        let mut changed = false;
        changed |= resolve_names(ctx, root, &self.node_scope);
        changed |= resolve_type_names(ctx, root, &self.node_scope, &self.type_index_of);
        changed |= instantiate_operators(ctx, root, &self.operators);
        changed |= propagate_auto(ctx, root);
        changed |= coerce_size_attributes(ctx, root);
        changed |= rewrite_requires_conditions(ctx, root);
        changed |= link_hooks(ctx, root);
        changed |= rewrite_void_fields(ctx, root, &self.options);

        tracing::debug!(changed, "resolver round complete");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpc_ast::{
        Declaration, DeclarationHeader, Expression, Linkage, ModuleDecl, ModuleUid, NodeKind, UnqualifiedType, ID,
    };
    use bpc_common::location::Location;

    fn here() -> Location {
        Location::synthetic("t.bpc")
    }

    #[test]
    fn a_single_round_resolves_a_name_reference_within_a_module() {
        let mut ctx = Context::new();
        let module = ctx.alloc(
            here(),
            NodeKind::Declaration(Declaration::Module(ModuleDecl {
                header: DeclarationHeader::new(ID::new("Test"), Linkage::Public),
                uid: ModuleUid { id: ID::new("Test"), path: None },
                extension: "bpc".into(),
                items: Vec::new(),
            })),
        );

        let bool_ty = ctx.alloc(here(), NodeKind::UnqualifiedType(UnqualifiedType::Bool));
        let global = ctx.alloc(
            here(),
            NodeKind::Declaration(Declaration::GlobalVariable {
                header: DeclarationHeader::new(ID::new("flag"), Linkage::Public),
                ty: bool_ty,
                init: None,
            }),
        );
        ctx.append_child(module, global);
        ctx.append_child(global, bool_ty);

        let reference = ctx.alloc(here(), NodeKind::Expression(Expression::Name { id: ID::new("flag"), scope: None }));
        ctx.append_child(module, reference);

        let mut resolver = Resolver::new(CompilerOptions::for_tests());
        let modified = resolver.run(&mut ctx, module).unwrap();
        assert!(modified);

        let rewritten = ctx.node(module).children[1];
        assert!(matches!(&ctx.node(rewritten).kind, NodeKind::Expression(Expression::ResolvedName(_))));
    }

    #[test]
    fn a_second_round_with_nothing_left_to_do_reports_no_change() {
        let mut ctx = Context::new();
        let module = ctx.alloc(
            here(),
            NodeKind::Declaration(Declaration::Module(ModuleDecl {
                header: DeclarationHeader::new(ID::new("Test"), Linkage::Public),
                uid: ModuleUid { id: ID::new("Test"), path: None },
                extension: "bpc".into(),
                items: Vec::new(),
            })),
        );

        let mut resolver = Resolver::new(CompilerOptions::for_tests());
        resolver.run(&mut ctx, module).unwrap();
        let second = resolver.run(&mut ctx, module).unwrap();
        assert!(!second);
    }
}
