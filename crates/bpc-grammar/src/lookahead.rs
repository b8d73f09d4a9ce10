//! Look-ahead computation: for each production, the set of concrete
//! terminal tokens that can start it, spread through non-terminals by a
//! fixpoint over the whole grammar table (units can reference each
//! other's grammars, including mutually).
//!
//! `Resolved` productions are deliberately opaque here (empty first-set):
//! a recursive reference doesn't contribute new start tokens to its own
//! alternative, the same way a recursive-descent parser has already
//! committed to an alternative before recursing into it.

use bpc_ast::{Context, Ctor, DeclarationIndex, NodeId, NodeKind};
use bpc_common::diagnostics::{Diagnostic, DiagnosticKind, Priority};
use bpc_common::limits::MAX_GRAMMAR_RECURSION;
use bpc_common::location::Location;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::production::{Grammar, Production, ProductionId};

/// A concrete terminal value a production can start with.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TerminalKey {
    Integer(i128),
    Bool(bool),
    StringLit(String),
    Bytes(Vec<u8>),
    Regexp(String),
}

pub type FirstSet = FxHashSet<TerminalKey>;

fn terminal_key_of(ctx: &Context, ctor_node: NodeId) -> Option<TerminalKey> {
    match &ctx.node(ctor_node).kind {
        NodeKind::Ctor(Ctor::Integer(v)) => Some(TerminalKey::Integer(*v)),
        NodeKind::Ctor(Ctor::Bool(b)) => Some(TerminalKey::Bool(*b)),
        NodeKind::Ctor(Ctor::String(s)) => Some(TerminalKey::StringLit(s.clone())),
        NodeKind::Ctor(Ctor::Bytes(b)) => Some(TerminalKey::Bytes(b.clone())),
        NodeKind::Ctor(Ctor::Regexp(r)) => Some(TerminalKey::Regexp(r.clone())),
        NodeKind::Ctor(Ctor::Null | Ctor::List(_) | Ctor::Struct(_) | Ctor::Error(_)) => None,
        _ => None,
    }
}

/// Look-ahead first-sets for every production in every unit's grammar,
/// keyed so that a `Production::Type` referencing another unit can look up
/// that unit's root set.
pub struct LookAheadTable {
    sets: FxHashMap<(DeclarationIndex, ProductionId), FirstSet>,
}

impl LookAheadTable {
    #[must_use]
    pub fn first_set(&self, unit: DeclarationIndex, production: ProductionId) -> Option<&FirstSet> {
        self.sets.get(&(unit, production))
    }

    #[must_use]
    pub fn root_first_set(&self, grammar: &Grammar) -> Option<&FirstSet> {
        self.first_set(grammar.unit, grammar.root)
    }
}

/// Seeds every `Ctor` production's literal terminal, then runs the
/// structural fixpoint (`Sequence`/`LookAhead`/`Switch`/`Loop`) over the
/// whole grammar table until a round adds nothing, bounded by
/// `MAX_GRAMMAR_RECURSION` as a non-termination safety net.
pub fn compute_lookahead(ctx: &Context, grammars: &FxHashMap<DeclarationIndex, Grammar>) -> LookAheadTable {
    let mut table = LookAheadTable { sets: FxHashMap::default() };

    for grammar in grammars.values() {
        for id in grammar.ids() {
            if let Production::Ctor(ctor_node) = grammar.get(id) {
                if let Some(key) = terminal_key_of(ctx, *ctor_node) {
                    table.sets.entry((grammar.unit, id)).or_default().insert(key);
                }
            }
        }
    }

    for _round in 0..MAX_GRAMMAR_RECURSION {
        let mut changed = false;
        for grammar in grammars.values() {
            for id in grammar.ids() {
                if matches!(grammar.get(id), Production::Ctor(_)) {
                    continue;
                }
                let computed = first_set_of(grammar, id, &table);
                let key = (grammar.unit, id);
                let existing = table.sets.entry(key).or_default();
                let before = existing.len();
                existing.extend(computed);
                if existing.len() != before {
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    table
}

fn first_set_of(grammar: &Grammar, id: ProductionId, table: &LookAheadTable) -> FirstSet {
    match grammar.get(id) {
        Production::Ctor(_) => FirstSet::default(),
        Production::Type(_) => FirstSet::default(),
        Production::Sequence(items) => sequence_first_set(grammar, items, table),
        Production::LookAhead(a, b) => {
            let mut set = table.first_set(grammar.unit, *a).cloned().unwrap_or_default();
            set.extend(table.first_set(grammar.unit, *b).cloned().unwrap_or_default());
            set
        }
        Production::Switch { arms, .. } => {
            let mut set = FirstSet::default();
            for arm in arms {
                set.extend(table.first_set(grammar.unit, arm.body).cloned().unwrap_or_default());
            }
            set
        }
        Production::Loop { body, .. } => table.first_set(grammar.unit, *body).cloned().unwrap_or_default(),
        Production::Resolved(_) => FirstSet::default(),
    }
}

/// A sequence's first-set is its first item's, falling through to the next
/// item only while the earlier ones are still empty (no terminal known
/// yet, not necessarily nullable — an approximation documented in
/// `DESIGN.md`).
fn sequence_first_set(grammar: &Grammar, items: &[ProductionId], table: &LookAheadTable) -> FirstSet {
    for &item in items {
        if let Some(set) = table.first_set(grammar.unit, item) {
            if !set.is_empty() {
                return set.clone();
            }
        }
    }
    FirstSet::default()
}

/// Checks every `LookAhead` production for overlapping alternatives,
/// pushing a `Grammar`-kind diagnostic at the unit's declaration location
/// for each ambiguity found.
pub fn check_ambiguous_lookahead(
    ctx: &mut Context,
    grammars: &FxHashMap<DeclarationIndex, Grammar>,
    table: &LookAheadTable,
    location_of: impl Fn(DeclarationIndex) -> Location,
) {
    for grammar in grammars.values() {
        for id in grammar.ids() {
            let Production::LookAhead(a, b) = grammar.get(id) else { continue };
            let (Some(set_a), Some(set_b)) = (table.first_set(grammar.unit, *a), table.first_set(grammar.unit, *b))
            else {
                continue;
            };
            if set_a.intersection(set_b).next().is_some() {
                ctx.diagnostics_mut().push(Diagnostic::error(
                    DiagnosticKind::Grammar,
                    location_of(grammar.unit),
                    "ambiguous look-ahead: alternatives share a starting terminal",
                    Priority::Normal,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::production::Grammar;

    fn here() -> Location {
        Location::synthetic("t.bpc")
    }

    #[test]
    fn overlapping_literal_alternatives_are_flagged_ambiguous() {
        let mut ctx = Context::new();
        let unit = DeclarationIndex::new(1);
        let mut grammar = Grammar::new(unit);

        let ctor_a = ctx.alloc(here(), NodeKind::Ctor(Ctor::Integer(1)));
        let ctor_b = ctx.alloc(here(), NodeKind::Ctor(Ctor::Integer(1)));
        let prod_a = grammar.alloc(Production::Ctor(ctor_a));
        let prod_b = grammar.alloc(Production::Ctor(ctor_b));
        let lookahead = grammar.alloc(Production::LookAhead(prod_a, prod_b));
        grammar.set_root(lookahead);

        let mut grammars = FxHashMap::default();
        grammars.insert(unit, grammar);

        let table = compute_lookahead(&ctx, &grammars);
        check_ambiguous_lookahead(&mut ctx, &grammars, &table, |_| here());

        let errors: Vec<_> = ctx.diagnostics().iter().filter(|d| d.kind == DiagnosticKind::Grammar).collect();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn disjoint_literal_alternatives_are_not_ambiguous() {
        let mut ctx = Context::new();
        let unit = DeclarationIndex::new(1);
        let mut grammar = Grammar::new(unit);

        let ctor_a = ctx.alloc(here(), NodeKind::Ctor(Ctor::Integer(1)));
        let ctor_b = ctx.alloc(here(), NodeKind::Ctor(Ctor::Integer(2)));
        let prod_a = grammar.alloc(Production::Ctor(ctor_a));
        let prod_b = grammar.alloc(Production::Ctor(ctor_b));
        let lookahead = grammar.alloc(Production::LookAhead(prod_a, prod_b));
        grammar.set_root(lookahead);

        let mut grammars = FxHashMap::default();
        grammars.insert(unit, grammar);

        let table = compute_lookahead(&ctx, &grammars);
        check_ambiguous_lookahead(&mut ctx, &grammars, &table, |_| here());

        assert!(!ctx.diagnostics().has_errors());
    }

    #[test]
    fn sequence_first_set_is_its_first_items() {
        let mut ctx = Context::new();
        let unit = DeclarationIndex::new(1);
        let mut grammar = Grammar::new(unit);
        let ctor_node = ctx.alloc(here(), NodeKind::Ctor(Ctor::Integer(7)));
        let ctor = grammar.alloc(Production::Ctor(ctor_node));
        let seq = grammar.alloc(Production::Sequence(vec![ctor]));
        grammar.set_root(seq);

        let mut grammars = FxHashMap::default();
        grammars.insert(unit, grammar);
        let table = compute_lookahead(&ctx, &grammars);
        let grammar = &grammars[&unit];
        let set = table.root_first_set(grammar).expect("root should have a first-set entry");
        assert!(set.contains(&TerminalKey::Integer(7)));
    }
}
