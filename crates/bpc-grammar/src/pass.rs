//! `GrammarPass`: the `Pass` that lowers every resolved unit in a module
//! into a grammar, computes look-ahead and synchronization points, and
//! tags self-recursive units `on_heap`. Unlike the resolver's stages, this
//! isn't meant to run every fixpoint round — it assumes the resolver has
//! already converged — but implementing `Pass` lets it plug into the same
//! `Context::process_ast` driver as a final transform stage.

use bpc_ast::{Context, InternalError, NodeId, Pass, UnqualifiedType};
use bpc_common::options::CompilerOptions;
use rustc_hash::FxHashMap;

use crate::build::build_grammar;
use crate::features::{compute_features, FeatureFlags};
use crate::lookahead::{check_ambiguous_lookahead, compute_lookahead, LookAheadTable};
use crate::production::Grammar;
use crate::recursion::{collect_units, tag_self_recursive_units_on_heap};
use crate::synchronize::{collect_sync_points, SyncPoints};

/// Everything `GrammarPass` derives for one module: every unit's grammar,
/// the shared look-ahead table, and per-unit sync points and feature flags.
#[derive(Default)]
pub struct GrammarOutput {
    pub grammars: FxHashMap<bpc_ast::DeclarationIndex, Grammar>,
    pub lookahead: Option<LookAheadTable>,
    pub sync_points: FxHashMap<bpc_ast::DeclarationIndex, SyncPoints>,
    pub features: FxHashMap<bpc_ast::DeclarationIndex, FeatureFlags>,
}

pub struct GrammarPass {
    options: CompilerOptions,
    pub output: GrammarOutput,
}

impl GrammarPass {
    #[must_use]
    pub fn new(options: CompilerOptions) -> Self {
        Self { options, output: GrammarOutput::default() }
    }
}

impl Pass for GrammarPass {
    fn run(&mut self, ctx: &mut Context, root: NodeId) -> Result<bool, InternalError> {
        let changed = tag_self_recursive_units_on_heap(ctx, root);

        let units = collect_units(ctx, root);

        let mut grammars = FxHashMap::default();
        for (decl_idx, ty, items, _properties) in &units {
            let grammar = build_grammar(ctx, *decl_idx, *ty, items);
            grammars.insert(*decl_idx, grammar);
        }

        let lookahead = compute_lookahead(ctx, &grammars);
        let root_location = ctx.node(root).meta.location.clone();
        let location_by_unit: FxHashMap<bpc_ast::DeclarationIndex, bpc_common::location::Location> = units
            .iter()
            .map(|(decl_idx, ..)| (*decl_idx, ctx.node(ctx.lookup_declaration(*decl_idx)).meta.location.clone()))
            .collect();
        check_ambiguous_lookahead(ctx, &grammars, &lookahead, |decl_idx| {
            location_by_unit.get(&decl_idx).cloned().unwrap_or_else(|| root_location.clone())
        });

        let mut sync_points = FxHashMap::default();
        let mut features = FxHashMap::default();
        for (decl_idx, ty, items, properties) in &units {
            let grammar = &grammars[decl_idx];
            let mut points = SyncPoints::default();
            collect_sync_points(ctx, *decl_idx, items, properties, grammar, &lookahead, &self.options, &mut points);
            let flags = compute_features(ctx, grammar, properties, items, &points);
            sync_points.insert(*decl_idx, points);
            features.insert(*decl_idx, flags);

            debug_assert!(matches!(ctx.unqualified_type(*ty), UnqualifiedType::Unit { .. }));
        }

        self.output = GrammarOutput { grammars, lookahead: Some(lookahead), sync_points, features };

        tracing::debug!(units = units.len(), "grammar pass complete");
        Ok(changed)
    }
}
