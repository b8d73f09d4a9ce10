//! The production model: a unit's grammar is a small private arena of
//! [`Production`] nodes, distinct from the context's node arena, since a
//! grammar is auxiliary compiler state derived from an already-resolved
//! unit rather than part of the AST itself (mirroring how the resolver
//! keeps its scope table and operator registry outside `Context`).

use bpc_ast::{DeclarationIndex, NodeId};

/// Index into one [`Grammar`]'s production arena. Not comparable across
/// different `Grammar`s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProductionId(u32);

impl ProductionId {
    fn slot(self) -> usize {
        self.0 as usize
    }
}

/// How a [`Production::Loop`] decides when to stop.
#[derive(Clone, Copy, Debug)]
pub enum LoopControl {
    /// Repeat exactly `count` times.
    Count(NodeId),
    /// Repeat while `condition` holds, re-evaluated each iteration.
    While(NodeId),
    /// No static bound; the emitter relies on a delimiter or `&synchronize`.
    Unbounded,
}

/// One arm of a [`Production::Switch`]. `values: None` marks the `default` arm.
#[derive(Clone, Debug)]
pub struct SwitchArm {
    pub values: Option<Vec<NodeId>>,
    pub body: ProductionId,
}

/// A node in a unit's production grammar (spec.md §4.5).
#[derive(Clone, Debug)]
pub enum Production {
    /// A literal to match: a regexp or constant bytes/integer/bool ctor.
    Ctor(NodeId),
    /// Parse via a sub-parser for a named (possibly builtin) type.
    Type(NodeId),
    /// An ordered list of sub-productions.
    Sequence(Vec<ProductionId>),
    /// A pair of alternatives disambiguated by the next input bytes.
    LookAhead(ProductionId, ProductionId),
    /// A discriminator expression choosing among cases.
    Switch { discriminant: NodeId, arms: Vec<SwitchArm> },
    /// Repeat a sub-production under a count/condition/delimiter.
    Loop { body: ProductionId, control: LoopControl },
    /// Indirection through another unit's grammar, breaking a recursive
    /// reference. Look-ahead computation treats this as opaque (empty
    /// first-set) rather than recursing, the same way a recursive-descent
    /// parser doesn't re-derive an already-chosen alternative's start set.
    Resolved(DeclarationIndex),
}

/// One unit type's complete grammar: a small arena of productions rooted
/// at `root`, plus the unit's own declaration index for diagnostics and
/// cross-grammar `Type`/`Resolved` lookups.
#[derive(Clone, Debug)]
pub struct Grammar {
    pub unit: DeclarationIndex,
    productions: Vec<Production>,
    pub root: ProductionId,
}

impl Grammar {
    /// Builds an empty grammar rooted at an empty `Sequence`, ready for
    /// [`GrammarBuilder`](crate::build::GrammarBuilder) to populate.
    #[must_use]
    pub fn new(unit: DeclarationIndex) -> Self {
        let mut productions = Vec::new();
        productions.push(Production::Sequence(Vec::new()));
        Self {
            unit,
            productions,
            root: ProductionId(0),
        }
    }

    pub fn alloc(&mut self, production: Production) -> ProductionId {
        self.productions.push(production);
        ProductionId((self.productions.len() - 1) as u32)
    }

    #[must_use]
    pub fn get(&self, id: ProductionId) -> &Production {
        &self.productions[id.slot()]
    }

    pub fn set_root(&mut self, root: ProductionId) {
        self.root = root;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.productions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    /// Iterates every production id in allocation order, for passes that
    /// need to visit all of them (look-ahead computation, feature tagging).
    pub fn ids(&self) -> impl Iterator<Item = ProductionId> {
        (0..self.productions.len() as u32).map(ProductionId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_increasing_ids_and_get_round_trips() {
        let mut grammar = Grammar::new(DeclarationIndex::new(1));
        let a = grammar.alloc(Production::Loop {
            body: ProductionId(0),
            control: LoopControl::Unbounded,
        });
        let b = grammar.alloc(Production::Resolved(DeclarationIndex::new(1)));
        assert_ne!(a, b);
        assert!(matches!(grammar.get(a), Production::Loop { .. }));
        assert!(matches!(grammar.get(b), Production::Resolved(_)));
    }
}
