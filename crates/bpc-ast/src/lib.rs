//! AST node model and context-managed identity for the protocol compiler
//! middle end: owns every node, assigns stable indices to declarations and
//! named types, and exposes the tagged-variant traversal protocol the
//! resolver, coercion engine, and grammar lowering are all built on.

pub mod collaborators;
pub mod context;
pub mod error;
pub mod id_path;
pub mod ids;
pub mod node;
pub mod scope;
pub mod visitor;

pub use collaborators::{Emitter, Pass, SourceParser};
pub use context::Context;
pub use error::{ContextError, InternalError, ProcessError};
pub use id_path::ID;
pub use ids::{DeclarationIndex, NodeId, ScopeId, TypeIndex};
pub use node::{
    Attribute, AttributeSet, Constness, Ctor, Declaration, DeclarationHeader, EnumVariant, Expression, Function,
    Hook, Linkage, Meta, ModuleDecl, ModuleUid, Node, NodeKind, Operator, OperatorKind, ParameterKind,
    QualifiedType, Statement, SwitchCase, UnitField, UnitFieldKind, UnqualifiedType,
};
pub use scope::ScopeTable;
pub use visitor::{walk, Dispatcher, Order};
