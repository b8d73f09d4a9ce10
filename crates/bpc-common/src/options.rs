//! Compiler-wide options shared by the resolver, coercion engine, and
//! grammar lowering.
//!
//! A plain struct of flags and counters with a couple of named presets,
//! rather than a config-file parser (that lives with the command-line
//! driver that sits outside this crate).

/// Compiler options for the middle end.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Maximum rounds the resolver's fixpoint driver will run before
    /// treating non-termination as an internal error.
    pub max_resolver_rounds: u32,

    /// When true, `Context::dump_state` is called after every resolver
    /// round and the result kept for inspection.
    pub dump_iterations: bool,

    /// When true, `&synchronize`/`%synchronize-at`/`%synchronize-after`
    /// productions without a terminal emit a warning instead of silently
    /// passing.
    pub warn_on_missing_synchronize_terminal: bool,

    /// When true, the legacy compatibility rewrite that turns an
    /// attribute-only void field into `skip bytes ...` is applied with a
    /// deprecation warning. When false, such fields are rejected and the
    /// caller must write `skip` explicitly.
    pub allow_implicit_skip_rewrite: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            max_resolver_rounds: crate::limits::MAX_RESOLVER_ROUNDS,
            dump_iterations: false,
            warn_on_missing_synchronize_terminal: true,
            allow_implicit_skip_rewrite: true,
        }
    }
}

impl CompilerOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options tuned for test scaffolding: fewer rounds, dumps enabled, and
    /// the implicit skip rewrite disabled so tests catch accidental
    /// reliance on the compatibility path.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            max_resolver_rounds: 32,
            dump_iterations: true,
            allow_implicit_skip_rewrite: false,
            ..Self::default()
        }
    }
}
