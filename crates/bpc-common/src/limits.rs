//! Centralized limits and thresholds for the compiler middle end.
//!
//! Centralizing these avoids duplicate definitions with inconsistent
//! values across the AST, coercion, resolver, and grammar crates, and
//! documents the rationale for each cap in one place.

/// Maximum number of fixpoint rounds the resolver will run before
/// treating non-termination as an internal error.
///
/// Each round is supposed to either resolve an `Unresolved*` node or
/// propagate a type into an `auto` slot — both monotone operations — so in
/// practice a well-formed module resolves in a handful of rounds. This is
/// a safety net, not an expected ceiling.
///
/// ```text
/// type R = unit { n: uint8; xs: R[n]; };
/// ```
/// resolves in two rounds: one to rewrite `R` into a struct, one to link
/// the self-referential `xs` field back to the now-registered `R`.
pub const MAX_RESOLVER_ROUNDS: u32 = 256;

/// Maximum rounds `Context::garbage_collect` will run while compacting the
/// live-node vector. GC is supposed to reach a fixed point (no further
/// drops) within a couple of rounds for any realistic tree; this guards
/// against a node graph that never stabilizes due to a context bug.
pub const MAX_GC_ROUNDS: u32 = 64;

/// Maximum recursion depth while computing a production's look-ahead set.
/// Guards against a grammar whose non-terminals form a cycle with no
/// `Resolved` indirection breaking it.
pub const MAX_GRAMMAR_RECURSION: u32 = 256;

/// Maximum recursion depth for AST traversal (scope rebuilding, dependency
/// computation, visitor dispatch). Prevents stack overflow on pathological
/// nesting such as deeply chained binary expressions.
pub const MAX_AST_DEPTH: u32 = 1_000;

/// Maximum iterations when walking a scope chain looking for a name.
/// Scope chains are acyclic by construction (parent pointers only point
/// toward the root), so this is purely a safety net against a corrupted
/// chain.
pub const MAX_SCOPE_WALK_ITERATIONS: u32 = 10_000;

/// Maximum recursion depth for coercion: parameterized types coerce their
/// arguments pairwise, and a deeply nested generic instantiation
/// (`vector<vector<vector<...>>>`) could otherwise recurse without bound.
pub const MAX_COERCION_DEPTH: u32 = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_nonzero() {
        assert!(MAX_RESOLVER_ROUNDS > 0);
        assert!(MAX_GC_ROUNDS > 0);
        assert!(MAX_GRAMMAR_RECURSION > 0);
        assert!(MAX_AST_DEPTH > 0);
        assert!(MAX_SCOPE_WALK_ITERATIONS > 0);
        assert!(MAX_COERCION_DEPTH > 0);
    }
}
