//! Traversal protocol: a dispatcher with one method per top-level node
//! variant (empty default), two driver orders, and a mutation flag that
//! lives on the [`Context`] so outer fixpoint loops can test for it.

use crate::context::Context;
use crate::ids::NodeId;
use crate::node::NodeKind;
use smallvec::SmallVec;

/// A visitor overrides the variants it cares about; everything else no-ops.
/// Node dispatch is a `match` on the tagged [`NodeKind`], not virtual calls,
/// so the compiler can warn on a variant a visitor forgot to handle when a
/// new one is added.
pub trait Dispatcher {
    fn visit_declaration(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_expression(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_statement(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_unqualified_type(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_qualified_type(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_ctor(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_attribute(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_attribute_set(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_function(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_hook(&mut self, _ctx: &mut Context, _id: NodeId) {}
    fn visit_operator(&mut self, _ctx: &mut Context, _id: NodeId) {}
}

fn dispatch<V: Dispatcher + ?Sized>(visitor: &mut V, ctx: &mut Context, id: NodeId) {
    match ctx.node(id).kind {
        NodeKind::Declaration(_) => visitor.visit_declaration(ctx, id),
        NodeKind::Expression(_) => visitor.visit_expression(ctx, id),
        NodeKind::Statement(_) => visitor.visit_statement(ctx, id),
        NodeKind::UnqualifiedType(_) => visitor.visit_unqualified_type(ctx, id),
        NodeKind::QualifiedType(_) => visitor.visit_qualified_type(ctx, id),
        NodeKind::Ctor(_) => visitor.visit_ctor(ctx, id),
        NodeKind::Attribute(_) => visitor.visit_attribute(ctx, id),
        NodeKind::AttributeSet(_) => visitor.visit_attribute_set(ctx, id),
        NodeKind::Function(_) => visitor.visit_function(ctx, id),
        NodeKind::Hook(_) => visitor.visit_hook(ctx, id),
        NodeKind::Operator(_) => visitor.visit_operator(ctx, id),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Order {
    PreOrder,
    PostOrder,
}

/// Walks the subtree rooted at `root`, dispatching to `visitor` in `order`.
///
/// Children are snapshotted before recursing into each one, so a visitor
/// that replaces a child mid-walk (via [`Context::replace_child`]) sees a
/// consistent traversal: the old subtree is skipped, the new one is not
/// retroactively visited this round.
pub fn walk<V: Dispatcher>(visitor: &mut V, ctx: &mut Context, root: NodeId, order: Order) {
    if order == Order::PreOrder {
        dispatch(visitor, ctx, root);
    }

    let children: SmallVec<[NodeId; 4]> = ctx.node(root).children.clone();
    for child in children {
        walk(visitor, ctx, child, order);
    }

    if order == Order::PostOrder {
        dispatch(visitor, ctx, root);
    }
}
