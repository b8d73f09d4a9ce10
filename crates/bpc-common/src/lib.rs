//! Common types and utilities shared across the protocol compiler.
//!
//! This crate sits at the bottom of the dependency graph so that the AST,
//! coercion, resolver, and grammar crates can all share one vocabulary for
//! source locations, diagnostics, compiler options, and recursion limits
//! without creating circular dependencies between themselves.

// Span - source location tracking (byte offsets)
pub mod span;
pub use span::{ByteSpan, Span, SpanBuilder, Spanned};

// File + span pairing used by diagnostics and declarations.
pub mod location;
pub use location::Location;

// Diagnostics: the (message, location, priority) model shared by all passes.
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSet, Priority};

// Compiler-wide options (resolver rounds, coercion defaults, debug dumps).
pub mod options;
pub use options::CompilerOptions;

// Centralized recursion depths and iteration caps.
pub mod limits;
