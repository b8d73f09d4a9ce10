//! Fixpoint resolver: name/type resolution, operator overload instantiation,
//! attribute coercion, hook linking, and unit/field lowering.
//!
//! A single [`Resolver`] implements `bpc_ast::Pass` and plugs into
//! `Context::process_ast`'s round loop, running every sub-stage below once
//! per round until a round leaves the tree unchanged.

pub mod attributes;
pub mod hooks;
pub mod names;
pub mod operators;
pub mod resolver;
pub mod scope_builder;
pub mod units;

pub use operators::OperatorRegistry;
pub use resolver::Resolver;
