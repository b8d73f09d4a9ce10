//! Thin traits for the external collaborators the middle end calls out to
//! but does not itself implement: surface-syntax parsing, target-code
//! emission, and the resolver's fixpoint-eligible passes.
//!
//! Keeping these as traits (rather than depending on a lexer/emitter crate
//! directly) lets `Context::process_ast` be exercised and tested against
//! fakes without pulling in lexing, target codegen, or process/JIT
//! orchestration — all of which live outside this workspace.

use crate::context::Context;
use crate::error::{ContextError, InternalError};
use crate::ids::NodeId;
use std::io::{Read, Write};

/// Registered per recognised source extension; the context invokes it
/// during `parse_source`. The returned module must expose a non-empty
/// local ID.
pub trait SourceParser {
    fn parse(&self, source: &mut dyn Read, path: &str, ctx: &mut Context) -> Result<NodeId, ContextError>;
}

/// Consumes a resolved module and walks its top-level declarations in
/// dependency order, emitting target-language source into `out`.
pub trait Emitter {
    fn emit(&self, module: NodeId, ctx: &Context, out: &mut dyn Write) -> Result<(), ContextError>;
}

/// One fixpoint-eligible stage of `process_ast`: validate-pre, resolve,
/// validate-post, or transform. Returns whether it modified the tree, so
/// the resolve stage's fixpoint driver can test for convergence.
pub trait Pass {
    fn run(&mut self, ctx: &mut Context, root: NodeId) -> Result<bool, InternalError>;
}
