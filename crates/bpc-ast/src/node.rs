//! The node hierarchy: expressions, statements, declarations, types, ctors,
//! attributes, functions, hooks, and operators, dispatched through a single
//! tagged-variant protocol (see [`crate::visitor`]).

use crate::id_path::ID;
use crate::ids::{DeclarationIndex, NodeId, TypeIndex};
use bpc_common::diagnostics::Diagnostic;
use bpc_common::location::Location;
use smallvec::SmallVec;

/// Comments and other non-semantic annotations carried alongside a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Meta {
    pub location: Location,
    pub comments: Vec<String>,
}

impl Meta {
    #[must_use]
    pub fn new(location: Location) -> Self {
        Self {
            location,
            comments: Vec::new(),
        }
    }
}

/// The context-managed wrapper every concrete node variant is stored behind.
///
/// Owns an ordered child list (by [`NodeId`], not by value — children live in
/// the same arena), a parent back-reference, source location/comments, and a
/// bag of attached diagnostics.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 4]>,
    pub meta: Meta,
    pub diagnostics: Vec<Diagnostic>,
    pub kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn new(id: NodeId, location: Location, kind: NodeKind) -> Self {
        Self {
            id,
            parent: None,
            children: SmallVec::new(),
            meta: Meta::new(location),
            diagnostics: Vec::new(),
            kind,
        }
    }
}

/// The tagged sum over every top-level node variant named.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Declaration(Declaration),
    Expression(Expression),
    Statement(Statement),
    UnqualifiedType(UnqualifiedType),
    QualifiedType(QualifiedType),
    Ctor(Ctor),
    Attribute(Attribute),
    AttributeSet(AttributeSet),
    Function(Function),
    Hook(Hook),
    Operator(Operator),
}

// ---------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Linkage {
    Private,
    Public,
    Init,
    PreInit,
    Struct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    In,
    InOut,
    Copy,
}

/// Fields shared by every concrete `Declaration` variant.
#[derive(Clone, Debug)]
pub struct DeclarationHeader {
    pub id: ID,
    pub canonical_id: Option<ID>,
    pub linkage: Linkage,
    pub scope: Option<crate::ids::ScopeId>,
    pub declaration_index: Option<DeclarationIndex>,
}

impl DeclarationHeader {
    #[must_use]
    pub fn new(id: ID, linkage: Linkage) -> Self {
        Self {
            id,
            canonical_id: None,
            linkage,
            scope: None,
            declaration_index: None,
        }
    }
}

/// A module's unique identifier: its local ID plus an optional normalized
/// filesystem path, the compound key the context's module maps are keyed on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleUid {
    pub id: ID,
    pub path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ModuleDecl {
    pub header: DeclarationHeader,
    pub uid: ModuleUid,
    pub extension: String,
    pub items: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub enum Declaration {
    Module(ModuleDecl),
    TypeDecl {
        header: DeclarationHeader,
        ty: NodeId,
    },
    GlobalVariable {
        header: DeclarationHeader,
        ty: NodeId,
        init: Option<NodeId>,
    },
    LocalVariable {
        header: DeclarationHeader,
        ty: NodeId,
        init: Option<NodeId>,
    },
    Parameter {
        header: DeclarationHeader,
        ty: NodeId,
        kind: ParameterKind,
    },
    Constant {
        header: DeclarationHeader,
        ty: NodeId,
        value: NodeId,
    },
    FunctionDecl {
        header: DeclarationHeader,
        function: NodeId,
    },
    /// A struct field, the post-unit-lowering form of a unit field.
    Field {
        header: DeclarationHeader,
        ty: NodeId,
    },
}

impl Declaration {
    #[must_use]
    pub fn header(&self) -> &DeclarationHeader {
        match self {
            Declaration::Module(m) => &m.header,
            Declaration::TypeDecl { header, .. }
            | Declaration::GlobalVariable { header, .. }
            | Declaration::LocalVariable { header, .. }
            | Declaration::Parameter { header, .. }
            | Declaration::Constant { header, .. }
            | Declaration::FunctionDecl { header, .. }
            | Declaration::Field { header, .. } => header,
        }
    }

    #[must_use]
    pub fn header_mut(&mut self) -> &mut DeclarationHeader {
        match self {
            Declaration::Module(m) => &mut m.header,
            Declaration::TypeDecl { header, .. }
            | Declaration::GlobalVariable { header, .. }
            | Declaration::LocalVariable { header, .. }
            | Declaration::Parameter { header, .. }
            | Declaration::Constant { header, .. }
            | Declaration::FunctionDecl { header, .. }
            | Declaration::Field { header, .. } => header,
        }
    }

    /// The `NodeId` of the type this declaration names, for declarations that
    /// have one (everything but `Module`).
    #[must_use]
    pub fn declared_type(&self) -> Option<NodeId> {
        match self {
            Declaration::Module(_) | Declaration::FunctionDecl { .. } => None,
            Declaration::TypeDecl { ty, .. }
            | Declaration::GlobalVariable { ty, .. }
            | Declaration::LocalVariable { ty, .. }
            | Declaration::Parameter { ty, .. }
            | Declaration::Constant { ty, .. }
            | Declaration::Field { ty, .. } => Some(*ty),
        }
    }

    #[must_use]
    pub fn is_type_decl(&self) -> bool {
        matches!(self, Declaration::TypeDecl { .. })
    }
}

// ---------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constness {
    Const,
    Mutable,
}

/// Pairs an `UnqualifiedType` with constness and alias provenance.
#[derive(Clone, Debug)]
pub struct QualifiedType {
    pub ty: NodeId,
    pub constness: Constness,
    /// Set when this type name was reached through a type alias rather than
    /// the type's defining declaration.
    pub is_alias: bool,
}

#[derive(Clone, Debug)]
pub struct EnumVariant {
    pub name: ID,
    pub value: i64,
}

#[derive(Clone, Debug)]
pub enum UnqualifiedType {
    Auto,
    Void,
    Bool,
    Bytes,
    String,
    Stream,
    StreamView,
    Integer { width: u8, signed: bool },
    Enum { variants: Vec<EnumVariant> },
    Optional(NodeId),
    Result(NodeId),
    StrongRef(NodeId),
    WeakRef(NodeId),
    ValueRef(NodeId),
    Iterator(NodeId),
    Vector(NodeId),
    Set(NodeId),
    List(NodeId),
    Map(NodeId, NodeId),
    Struct {
        fields: Vec<NodeId>,
    },
    Unit {
        items: Vec<NodeId>,
        properties: Vec<NodeId>,
        on_heap: bool,
    },
    /// Unresolved reference to a named type, by path.
    Name(ID),
    /// Resolved reference into the context's type table (the alias case:
    /// no new type is created, the name just points here).
    ResolvedName(TypeIndex),
}

impl UnqualifiedType {
    #[must_use]
    pub fn is_reference_like(&self) -> bool {
        matches!(
            self,
            UnqualifiedType::StrongRef(_) | UnqualifiedType::WeakRef(_) | UnqualifiedType::ValueRef(_)
        )
    }

    #[must_use]
    pub fn parameters(&self) -> SmallVec<[NodeId; 2]> {
        match self {
            UnqualifiedType::Optional(t)
            | UnqualifiedType::Result(t)
            | UnqualifiedType::StrongRef(t)
            | UnqualifiedType::WeakRef(t)
            | UnqualifiedType::ValueRef(t)
            | UnqualifiedType::Iterator(t)
            | UnqualifiedType::Vector(t)
            | UnqualifiedType::Set(t)
            | UnqualifiedType::List(t) => SmallVec::from_slice(&[*t]),
            UnqualifiedType::Map(k, v) => SmallVec::from_slice(&[*k, *v]),
            _ => SmallVec::new(),
        }
    }
}

// ---------------------------------------------------------------------
// Ctors (constructor values)
// ---------------------------------------------------------------------

#[derive(Clone, Debug)]
pub enum Ctor {
    Integer(i128),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Null,
    List(Vec<NodeId>),
    Struct(Vec<(ID, NodeId)>),
    Error(String),
    /// A regular-expression literal used as a grammar terminal.
    Regexp(String),
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    Greater,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Negate,
    Deref,
    Size,
    Cast,
    MemberCall,
    Subscript,
    Call,
}

#[derive(Clone, Debug)]
pub enum Expression {
    /// Unresolved name lookup.
    Name { id: ID, scope: Option<crate::ids::ScopeId> },
    /// Resolved name, pointing into the context's declaration table.
    ResolvedName(DeclarationIndex),
    Ctor(NodeId),
    UnresolvedOperator {
        kind: OperatorKind,
        operands: Vec<NodeId>,
    },
    ResolvedOperator {
        operator: NodeId,
        operands: Vec<NodeId>,
    },
    Member {
        base: NodeId,
        member: ID,
    },
    Ternary {
        condition: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    /// Wraps `inner` to be reinterpreted as `target_type` at lowering time;
    /// the final fallback of the coercion engine.
    Coerced {
        inner: NodeId,
        target_type: NodeId,
    },
}

// ---------------------------------------------------------------------
// Statements (including unit body items)
// ---------------------------------------------------------------------

#[derive(Clone, Debug)]
pub enum UnitFieldKind {
    /// Not yet classified by the resolver.
    Unresolved,
    /// A literal to match (regexp or constant bytes/ctor).
    Ctor(NodeId),
    /// Parse via a sub-parser for the named type.
    Type(NodeId),
    Switch {
        discriminant: NodeId,
        cases: Vec<SwitchCase>,
    },
    /// A nested sequence of sub-items, e.g. a unit field with `&convert`.
    Sequence(Vec<NodeId>),
    /// The backwards-compatibility rewrite target for an attribute-only void field.
    Skip,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    /// `None` marks the `default` arm.
    pub values: Option<Vec<NodeId>>,
    pub body: NodeId,
}

#[derive(Clone, Debug)]
pub struct UnitField {
    pub name: Option<ID>,
    pub kind: UnitFieldKind,
    pub attributes: NodeId,
    /// The `&requires` condition rewritten to a ternary-error expression, if any.
    pub condition: Option<NodeId>,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Block(Vec<NodeId>),
    ExprStatement(NodeId),
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    Return(Option<NodeId>),
    UnitField(UnitField),
}

// ---------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Attribute {
    pub name: String,
    pub value: Option<NodeId>,
}

#[derive(Clone, Debug, Default)]
pub struct AttributeSet {
    pub attributes: Vec<NodeId>,
}

impl AttributeSet {
    #[must_use]
    pub fn find<'a>(&self, nodes: &'a [Node], name: &str) -> Option<&'a Attribute> {
        self.attributes.iter().find_map(|id| match &nodes[id.slot()].kind {
            NodeKind::Attribute(a) if a.name == name => Some(a),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------
// Functions, hooks, operators
// ---------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Function {
    pub parameters: Vec<NodeId>,
    pub result: NodeId,
    pub body: Option<NodeId>,
}

#[derive(Clone, Debug)]
pub struct Hook {
    pub unit: Option<DeclarationIndex>,
    /// The unit name written by an externally-declared hook (`on Greeting::%done`),
    /// before it's resolved into `unit`. `None` for a hook declared inside its unit's body.
    pub unit_name: Option<ID>,
    pub field: Option<ID>,
    /// Normalized hook name, e.g. `%done`, `%error`, `%print`.
    pub name: String,
    pub function: NodeId,
}

#[derive(Clone, Debug)]
pub struct Operator {
    pub kind: OperatorKind,
    pub operands: Vec<NodeId>,
    pub result: NodeId,
}
