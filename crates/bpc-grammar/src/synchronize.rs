//! Synchronization-point bookkeeping: `&synchronize` on a field and
//! `%synchronize-at`/`%synchronize-after` as unit properties are recorded
//! in a table the emitter can later use to plant resynchronization code,
//! and a field tagged `&synchronize` with no terminal of its own (empty
//! first-set) gets a warning rather than being rejected outright.

use bpc_ast::{AttributeSet, Context, DeclarationIndex, NodeId, NodeKind, Statement, UnitField};
use bpc_common::diagnostics::{Diagnostic, DiagnosticKind};
use bpc_common::options::CompilerOptions;
use rustc_hash::FxHashMap;

use crate::lookahead::LookAheadTable;
use crate::production::Grammar;

const SYNCHRONIZE: &str = "synchronize";
const SYNCHRONIZE_AT: &str = "synchronize-at";
const SYNCHRONIZE_AFTER: &str = "synchronize-after";

/// The synchronization points declared across a module: field ids tagged
/// `&synchronize`, plus unit-level `%synchronize-at`/`%synchronize-after`
/// property values, keyed by the owning unit.
#[derive(Default, Debug, Clone)]
pub struct SyncPoints {
    pub synchronized_fields: Vec<NodeId>,
    pub unit_properties: FxHashMap<DeclarationIndex, Vec<(&'static str, NodeId)>>,
}

impl SyncPoints {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.synchronized_fields.is_empty() && self.unit_properties.is_empty()
    }
}

fn has_flag_attribute(ctx: &Context, attribute_set: NodeId, name: &str) -> bool {
    let AttributeSet { attributes } = match &ctx.node(attribute_set).kind {
        NodeKind::AttributeSet(set) => set,
        _ => return false,
    };
    attributes.iter().any(|&id| matches!(&ctx.node(id).kind, NodeKind::Attribute(a) if a.name == name))
}

/// Walks `items` (a unit's field list) collecting `&synchronize`-tagged
/// fields, and `properties` collecting `%synchronize-at`/`-after`
/// attributes, recording both under `unit` in `points`. Also warns (gated
/// by `options.warn_on_missing_synchronize_terminal`) when a synchronized
/// field's production has no terminal of its own.
pub fn collect_sync_points(
    ctx: &mut Context,
    unit: DeclarationIndex,
    items: &[NodeId],
    properties: &[NodeId],
    grammar: &Grammar,
    lookahead: &LookAheadTable,
    options: &CompilerOptions,
    points: &mut SyncPoints,
) {
    for &prop in properties {
        if let NodeKind::Attribute(attr) = &ctx.node(prop).kind {
            let tag = if attr.name == SYNCHRONIZE_AT {
                Some(SYNCHRONIZE_AT)
            } else if attr.name == SYNCHRONIZE_AFTER {
                Some(SYNCHRONIZE_AFTER)
            } else {
                None
            };
            if let Some(tag) = tag {
                points.unit_properties.entry(unit).or_default().push((tag, prop));
            }
        }
    }

    for (index, &item) in items.iter().enumerate() {
        let UnitField { attributes, .. } = match &ctx.node(item).kind {
            NodeKind::Statement(Statement::UnitField(f)) => f.clone(),
            _ => continue,
        };
        if !has_flag_attribute(ctx, attributes, SYNCHRONIZE) {
            continue;
        }
        points.synchronized_fields.push(item);

        let has_terminal = field_production_id(grammar, index)
            .and_then(|id| lookahead.first_set(unit, id))
            .is_some_and(|set| !set.is_empty());
        if !has_terminal && options.warn_on_missing_synchronize_terminal {
            ctx.diagnostics_mut().push(Diagnostic::warning(
                DiagnosticKind::Grammar,
                ctx.node(item).meta.location.clone(),
                "field tagged '&synchronize' has no terminal of its own",
            ));
        }
    }
}

/// The grammar builder allocates one production per item, in the same
/// order, as direct children of the root `Sequence` — so the field at
/// `items[index]` is `Sequence`'s `index`-th entry.
fn field_production_id(grammar: &Grammar, index: usize) -> Option<crate::production::ProductionId> {
    match grammar.get(grammar.root) {
        crate::production::Production::Sequence(parts) => parts.get(index).copied(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpc_ast::{Attribute, Ctor, UnitFieldKind, ID};
    use bpc_common::location::Location;

    fn here() -> Location {
        Location::synthetic("t.bpc")
    }

    #[test]
    fn synchronize_field_with_no_terminal_warns_when_enabled() {
        let mut ctx = Context::new();
        let unit = DeclarationIndex::new(1);

        let sync_attr = ctx.alloc(here(), NodeKind::Attribute(Attribute { name: SYNCHRONIZE.into(), value: None }));
        let attrs = ctx.alloc(here(), NodeKind::AttributeSet(AttributeSet { attributes: vec![sync_attr] }));
        let ty = ctx.alloc(here(), NodeKind::UnqualifiedType(bpc_ast::UnqualifiedType::Bytes));
        let field = ctx.alloc(
            here(),
            NodeKind::Statement(Statement::UnitField(UnitField {
                name: Some(ID::new("x")),
                kind: UnitFieldKind::Type(ty),
                attributes: attrs,
                condition: None,
            })),
        );

        let mut grammar = Grammar::new(unit);
        let prod = grammar.alloc(crate::production::Production::Type(ty));
        let seq = grammar.alloc(crate::production::Production::Sequence(vec![prod]));
        grammar.set_root(seq);

        let mut grammars = FxHashMap::default();
        grammars.insert(unit, grammar.clone());
        let lookahead = crate::lookahead::compute_lookahead(&ctx, &grammars);

        let options = CompilerOptions::default();
        let mut points = SyncPoints::default();
        collect_sync_points(&mut ctx, unit, &[field], &[], &grammar, &lookahead, &options, &mut points);

        assert_eq!(points.synchronized_fields.len(), 1);
        assert!(ctx.diagnostics().iter().any(|d| d.kind == DiagnosticKind::Grammar));
    }

    #[test]
    fn synchronize_field_with_a_terminal_does_not_warn() {
        let mut ctx = Context::new();
        let unit = DeclarationIndex::new(1);

        let sync_attr = ctx.alloc(here(), NodeKind::Attribute(Attribute { name: SYNCHRONIZE.into(), value: None }));
        let attrs = ctx.alloc(here(), NodeKind::AttributeSet(AttributeSet { attributes: vec![sync_attr] }));
        let ctor = ctx.alloc(here(), NodeKind::Ctor(Ctor::Bytes(vec![0xff])));
        let field = ctx.alloc(
            here(),
            NodeKind::Statement(Statement::UnitField(UnitField {
                name: Some(ID::new("x")),
                kind: UnitFieldKind::Ctor(ctor),
                attributes: attrs,
                condition: None,
            })),
        );

        let mut grammar = Grammar::new(unit);
        let prod = grammar.alloc(crate::production::Production::Ctor(ctor));
        let seq = grammar.alloc(crate::production::Production::Sequence(vec![prod]));
        grammar.set_root(seq);

        let mut grammars = FxHashMap::default();
        grammars.insert(unit, grammar.clone());
        let lookahead = crate::lookahead::compute_lookahead(&ctx, &grammars);

        let options = CompilerOptions::default();
        let mut points = SyncPoints::default();
        collect_sync_points(&mut ctx, unit, &[field], &[], &grammar, &lookahead, &options, &mut points);

        assert!(!ctx.diagnostics().iter().any(|d| d.kind == DiagnosticKind::Grammar));
    }
}
