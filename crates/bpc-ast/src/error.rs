//! Fallible-operation error types.
//!
//! Ordinary user-facing problems (unresolved names, bad coercions, grammar
//! ambiguity) are *diagnostics*, collected on nodes and reported at the end
//! of a stage — see [`bpc_common::diagnostics`]. The types here are for the
//! small set of context operations that can themselves fail, and for
//! invariant violations, which are never diagnostics and always abort the
//! pipeline through a distinct channel.

use crate::id_path::ID;
use std::fmt;

/// A context operation that failed outright, as opposed to merely collecting
/// a diagnostic for later reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// `update_module_uid` would have collided with an already-registered UID.
    DuplicateModuleUid(ID),
    /// `process_ast` ran a stage collaborator that reported failure.
    StageFailed(String),
    /// The registered `SourceParser` for an extension failed to parse a source.
    ParseFailed(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::DuplicateModuleUid(id) => {
                write!(f, "module UID '{id}' is already registered")
            }
            ContextError::StageFailed(stage) => write!(f, "stage '{stage}' failed"),
            ContextError::ParseFailed(msg) => write!(f, "parse failed: {msg}"),
        }
    }
}

impl std::error::Error for ContextError {}

/// An invariant violation: a bug in the compiler itself, never user-facing.
/// Aborts compilation through a channel distinct from ordinary diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InternalError {
    /// The resolver's fixpoint driver did not converge within the configured
    /// round limit.
    ResolverDidNotConverge { rounds: u32 },
    /// Garbage collection did not reach a fixed point within the round limit.
    GcDidNotConverge { rounds: u32 },
    /// A scope-chain walk exceeded the iteration safety net, implying a
    /// corrupted (non-tree-shaped) parent chain.
    ScopeChainCorrupted,
    /// Grammar look-ahead recursion exceeded the configured depth.
    GrammarRecursionExceeded,
    /// A context index was used after the slot it names was never registered.
    DanglingIndex,
    /// `register_type` was asked to assign an index to a wildcard type (`auto`),
    /// which by construction never gets one.
    WildcardTypeRegistration,
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalError::ResolverDidNotConverge { rounds } => {
                write!(f, "resolver did not converge after {rounds} rounds")
            }
            InternalError::GcDidNotConverge { rounds } => {
                write!(f, "garbage collection did not converge after {rounds} rounds")
            }
            InternalError::ScopeChainCorrupted => write!(f, "scope chain walk exceeded iteration cap"),
            InternalError::GrammarRecursionExceeded => {
                write!(f, "grammar look-ahead recursion exceeded configured depth")
            }
            InternalError::DanglingIndex => write!(f, "context index used before registration"),
            InternalError::WildcardTypeRegistration => {
                write!(f, "attempted to register a wildcard (auto) type with a TypeIndex")
            }
        }
    }
}

impl std::error::Error for InternalError {}

/// The outcome of [`crate::context::Context::process_ast`]: a failed stage
/// collaborator, or an invariant violation, kept on a channel distinct from
/// ordinary collected diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessError {
    Context(ContextError),
    Internal(InternalError),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Context(e) => write!(f, "{e}"),
            ProcessError::Internal(e) => write!(f, "internal error: {e}"),
        }
    }
}

impl std::error::Error for ProcessError {}

impl From<ContextError> for ProcessError {
    fn from(e: ContextError) -> Self {
        ProcessError::Context(e)
    }
}

impl From<InternalError> for ProcessError {
    fn from(e: InternalError) -> Self {
        ProcessError::Internal(e)
    }
}
