//! Grammar construction and unit lowering.
//!
//! Takes a resolved module (every name bound, every attribute coerced) and
//! derives, per unit: its production grammar, look-ahead first-sets,
//! synchronization points, and feature flags — plus the `on_heap` rewrite
//! for self-recursive units. Nothing here mutates field types or adds new
//! AST node kinds; `UnqualifiedType::Unit` is already record-shaped, so
//! lowering only tags it.

pub mod build;
pub mod features;
pub mod lookahead;
pub mod pass;
pub mod production;
pub mod recursion;
pub mod synchronize;

pub use build::build_grammar;
pub use features::{compute_features, FeatureFlags};
pub use lookahead::{check_ambiguous_lookahead, compute_lookahead, FirstSet, LookAheadTable, TerminalKey};
pub use pass::{GrammarOutput, GrammarPass};
pub use production::{Grammar, LoopControl, Production, ProductionId, SwitchArm};
pub use recursion::{collect_units, tag_self_recursive_units_on_heap};
pub use synchronize::{collect_sync_points, SyncPoints};
