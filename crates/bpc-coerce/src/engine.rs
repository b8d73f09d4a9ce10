//! The coercion algorithm: given a source expression/type and a destination
//! type, produce either a (possibly wrapped) node of the destination type
//! or signal failure. Grounded in `coercion.cc`'s `_coerceType`/
//! `_coerceExpression`/`coerceOperands` split — `VisitorType` there becomes
//! [`coerce_type`] here, `VisitorCtor` becomes the literal-specific rules in
//! [`coerce_expression`], and the fallback wrap-in-`Coerced` is rule 12.

use crate::error::CoerceError;
use crate::style::CoercionStyle;
use bpc_ast::{Constness, Context, Ctor, Expression, NodeId, NodeKind, QualifiedType, UnqualifiedType};

/// The result of a successful expression-level coercion.
///
/// `consider_type_changed` is `true` whenever the destination's *primary*
/// type differs from the source's — used by `coerce_operands` to enforce
/// `DisallowTypeChanges`. `nexpr` is `true` when `coerced_node` is a freshly
/// allocated node distinct from the input `expr` (a promotion or the final
/// `Coerced` wrap), `false` when the input expression itself satisfied the
/// destination unchanged.
#[derive(Clone, Copy, Debug)]
pub struct CoercedExpression {
    pub src_type: NodeId,
    pub coerced_node: NodeId,
    pub consider_type_changed: bool,
    pub nexpr: bool,
}

/// Outcome of the pure type-level half of the algorithm (steps 1-6).
struct TypeCoercion {
    changed: bool,
    /// Set when the destination is `optional<T>`/`result<T>`/`value_ref<T>`
    /// and `src` coerces into the wrapped `T` rather than matching directly.
    promotes_into: Option<PromotionKind>,
}

#[derive(Clone, Copy)]
enum PromotionKind {
    Optional,
    Result,
    ValueRef,
}

fn unqualified<'c>(ctx: &'c Context, qty: NodeId) -> &'c UnqualifiedType {
    match &ctx.node(qty).kind {
        NodeKind::QualifiedType(q) => ctx.unqualified_type(q.ty),
        NodeKind::UnqualifiedType(t) => t,
        _ => panic!("node {qty} is not a type"),
    }
}

fn qualified<'c>(ctx: &'c Context, qty: NodeId) -> Option<&'c QualifiedType> {
    match &ctx.node(qty).kind {
        NodeKind::QualifiedType(q) => Some(q),
        _ => None,
    }
}

fn constness(ctx: &Context, qty: NodeId) -> Option<Constness> {
    qualified(ctx, qty).map(|q| q.constness)
}

/// Structural equality over the unqualified shape, ignoring constness.
fn types_structurally_equal(ctx: &Context, a: NodeId, b: NodeId) -> bool {
    let (ua, ub) = (unqualified(ctx, a), unqualified(ctx, b));
    match (ua, ub) {
        (UnqualifiedType::Auto, UnqualifiedType::Auto)
        | (UnqualifiedType::Void, UnqualifiedType::Void)
        | (UnqualifiedType::Bool, UnqualifiedType::Bool)
        | (UnqualifiedType::Bytes, UnqualifiedType::Bytes)
        | (UnqualifiedType::String, UnqualifiedType::String)
        | (UnqualifiedType::Stream, UnqualifiedType::Stream)
        | (UnqualifiedType::StreamView, UnqualifiedType::StreamView) => true,
        (UnqualifiedType::Integer { width: w1, signed: s1 }, UnqualifiedType::Integer { width: w2, signed: s2 }) => {
            w1 == w2 && s1 == s2
        }
        (UnqualifiedType::ResolvedName(i1), UnqualifiedType::ResolvedName(i2)) => i1 == i2,
        (UnqualifiedType::Optional(t1), UnqualifiedType::Optional(t2))
        | (UnqualifiedType::Result(t1), UnqualifiedType::Result(t2))
        | (UnqualifiedType::StrongRef(t1), UnqualifiedType::StrongRef(t2))
        | (UnqualifiedType::WeakRef(t1), UnqualifiedType::WeakRef(t2))
        | (UnqualifiedType::ValueRef(t1), UnqualifiedType::ValueRef(t2))
        | (UnqualifiedType::Iterator(t1), UnqualifiedType::Iterator(t2))
        | (UnqualifiedType::Vector(t1), UnqualifiedType::Vector(t2))
        | (UnqualifiedType::Set(t1), UnqualifiedType::Set(t2))
        | (UnqualifiedType::List(t1), UnqualifiedType::List(t2)) => types_structurally_equal(ctx, *t1, *t2),
        (UnqualifiedType::Map(k1, v1), UnqualifiedType::Map(k2, v2)) => {
            types_structurally_equal(ctx, *k1, *k2) && types_structurally_equal(ctx, *v1, *v2)
        }
        _ => false,
    }
}

/// Steps 1-6 of the algorithm: type-level compatibility, ignoring any
/// ctor-specific literal rule.
fn coerce_type(ctx: &Context, src: NodeId, dst: NodeId, style: CoercionStyle) -> Result<TypeCoercion, CoerceError> {
    // 1. Both sides are named (carry a TypeIndex identity) and differ -> fail;
    //    equal -> succeed unchanged.
    if let (UnqualifiedType::ResolvedName(a), UnqualifiedType::ResolvedName(b)) =
        (unqualified(ctx, src), unqualified(ctx, dst))
    {
        return if a == b {
            Ok(TypeCoercion { changed: false, promotes_into: None })
        } else {
            Err(CoerceError::TypeMismatch)
        };
    }

    // 2. `auto` destination always succeeds unchanged; the resolver revisits it.
    if matches!(unqualified(ctx, dst), UnqualifiedType::Auto) {
        return Ok(TypeCoercion { changed: false, promotes_into: None });
    }

    let const_ok = |src: NodeId, dst: NodeId| -> bool {
        match (constness(ctx, src), constness(ctx, dst)) {
            (Some(Constness::Mutable), Some(Constness::Const)) => true,
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    };

    // 3. Exact match (respecting the style's constness rule).
    if style.contains(CoercionStyle::TRY_EXACT_MATCH)
        && types_structurally_equal(ctx, src, dst)
        && const_ok(src, dst)
    {
        return Ok(TypeCoercion { changed: false, promotes_into: None });
    }

    // 4. Const promotion: types differ only in constness.
    if style.contains(CoercionStyle::TRY_CONST_PROMOTION)
        && types_structurally_equal(ctx, src, dst)
    {
        return Ok(TypeCoercion { changed: false, promotes_into: None });
    }

    // 5. Assignment/FunctionCall: promote into optional<T>/result<T>/value_ref<T>.
    if style.intersects(CoercionStyle::ASSIGNMENT | CoercionStyle::FUNCTION_CALL) {
        let promotion = match unqualified(ctx, dst) {
            UnqualifiedType::Optional(inner) => Some((PromotionKind::Optional, *inner)),
            UnqualifiedType::Result(inner) => Some((PromotionKind::Result, *inner)),
            UnqualifiedType::ValueRef(inner) => Some((PromotionKind::ValueRef, *inner)),
            _ => None,
        };
        if let Some((kind, inner)) = promotion {
            let already_wrapped = match (unqualified(ctx, src), &kind) {
                (UnqualifiedType::Optional(_), PromotionKind::Optional)
                | (UnqualifiedType::Result(_), PromotionKind::Result)
                | (UnqualifiedType::ValueRef(_), PromotionKind::ValueRef) => true,
                _ => false,
            };
            if !already_wrapped {
                let recursing = style | CoercionStyle::RECURSING;
                coerce_type(ctx, src, inner, recursing)?;
                return Ok(TypeCoercion { changed: true, promotes_into: Some(kind) });
            }
        }
    }

    // 6. Parameterized types match pairwise.
    let (params_src, params_dst) = (
        unqualified(ctx, src).parameters(),
        unqualified(ctx, dst).parameters(),
    );
    if !params_src.is_empty() || !params_dst.is_empty() {
        if same_constructor(unqualified(ctx, src), unqualified(ctx, dst)) && params_src.len() == params_dst.len() {
            let recursing = style | CoercionStyle::RECURSING;
            for (p_src, p_dst) in params_src.iter().zip(params_dst.iter()) {
                coerce_type(ctx, *p_src, *p_dst, recursing)?;
            }
            return Ok(TypeCoercion { changed: false, promotes_into: None });
        }
    }

    // Bytes <-> stream view, Assignment/FunctionCall style only.
    if style.intersects(CoercionStyle::ASSIGNMENT | CoercionStyle::FUNCTION_CALL) {
        match (unqualified(ctx, src), unqualified(ctx, dst)) {
            (UnqualifiedType::Bytes, UnqualifiedType::Stream)
            | (UnqualifiedType::StreamView, UnqualifiedType::Bytes) => {
                return Ok(TypeCoercion { changed: true, promotes_into: None });
            }
            _ => {}
        }
    }

    // Contextual (truthiness) conversion to bool.
    if style.contains(CoercionStyle::CONTEXTUAL_CONVERSION) && matches!(unqualified(ctx, dst), UnqualifiedType::Bool) {
        if is_truthiness_convertible(unqualified(ctx, src)) {
            return Ok(TypeCoercion { changed: true, promotes_into: None });
        }
    }

    if style.contains(CoercionStyle::TRY_COERCION) {
        return Ok(TypeCoercion { changed: true, promotes_into: None });
    }

    Err(CoerceError::NoApplicableRule { style })
}

fn same_constructor(a: &UnqualifiedType, b: &UnqualifiedType) -> bool {
    use UnqualifiedType::*;
    matches!(
        (a, b),
        (Optional(_), Optional(_))
            | (Result(_), Result(_))
            | (StrongRef(_), StrongRef(_))
            | (WeakRef(_), WeakRef(_))
            | (ValueRef(_), ValueRef(_))
            | (Iterator(_), Iterator(_))
            | (Vector(_), Vector(_))
            | (Set(_), Set(_))
            | (List(_), List(_))
            | (Map(_, _), Map(_, _))
    )
}

fn is_truthiness_convertible(ty: &UnqualifiedType) -> bool {
    matches!(
        ty,
        UnqualifiedType::Integer { .. }
            | UnqualifiedType::Optional(_)
            | UnqualifiedType::Enum { .. }
            | UnqualifiedType::StrongRef(_)
            | UnqualifiedType::WeakRef(_)
            | UnqualifiedType::Result(_)
    )
}

fn integer_fits(value: i128, width: u8, signed: bool) -> bool {
    if signed {
        let max = (1i128 << (width - 1)) - 1;
        let min = -(1i128 << (width - 1));
        value >= min && value <= max
    } else {
        let max = (1i128 << width) - 1;
        value >= 0 && value <= max
    }
}

/// Coerces a whole operand list against a candidate signature (an operator
/// overload or function call's parameter types), enforcing the ambiguity
/// rule: more than one operand changing its primary type makes the match
/// ambiguous, unless `FUNCTION_CALL` style relaxes it (named arguments and
/// defaulted parameters already disambiguate those call sites).
pub fn coerce_operands(
    ctx: &mut Context,
    operands: &[(NodeId, NodeId)],
    dst_types: &[NodeId],
    style: CoercionStyle,
) -> Result<Vec<CoercedExpression>, CoerceError> {
    if operands.len() != dst_types.len() {
        return Err(CoerceError::TypeMismatch);
    }

    let mut results = Vec::with_capacity(operands.len());
    let mut changed_count = 0usize;
    for (&(expr, src_type), &dst_type) in operands.iter().zip(dst_types.iter()) {
        let coerced = coerce_expression(ctx, expr, src_type, dst_type, style)?;
        if coerced.consider_type_changed {
            changed_count += 1;
        }
        results.push(coerced);
    }

    let relaxed_by_function_call = style.contains(CoercionStyle::FUNCTION_CALL);
    if changed_count > 1 && style.contains(CoercionStyle::DISALLOW_TYPE_CHANGES) && !relaxed_by_function_call {
        tracing::debug!(changed_count, operands = operands.len(), "operand coercion rejected as ambiguous");
        return Err(CoerceError::AmbiguousTypeChange);
    }

    tracing::trace!(operands = operands.len(), changed_count, "operand coercion complete");
    Ok(results)
}

/// The full expression-level algorithm: type-level compatibility plus
/// ctor-specific literal rules (steps 7-11), falling back to a `Coerced`
/// wrap under `TryCoercion` (step 12).
pub fn coerce_expression(
    ctx: &mut Context,
    expr: NodeId,
    src_type: NodeId,
    dst_type: NodeId,
    style: CoercionStyle,
) -> Result<CoercedExpression, CoerceError> {
    // Ctor-specific rules take priority when the expression is a literal,
    // since a literal's *value* can make an otherwise-failing type coercion
    // succeed (e.g. `42` into a narrower `uint8`).
    if let NodeKind::Expression(Expression::Ctor(ctor_id)) = &ctx.node(expr).kind {
        let ctor_id = *ctor_id;
        if let Some(result) = try_ctor_rule(ctx, expr, ctor_id, dst_type, style)? {
            return Ok(result);
        }
    }

    match coerce_type(ctx, src_type, dst_type, style) {
        Ok(outcome) => Ok(finish(ctx, expr, src_type, dst_type, outcome)),
        Err(CoerceError::NoApplicableRule { .. }) if style.contains(CoercionStyle::TRY_COERCION) => {
            // Rule 12: final fallback, wrap in a `Coerced` node.
            tracing::trace!(expr = expr.get(), dst_type = dst_type.get(), "falling back to a Coerced wrap");
            let coerced = ctx.alloc(
                ctx.node(expr).meta.location.clone(),
                NodeKind::Expression(Expression::Coerced {
                    inner: expr,
                    target_type: dst_type,
                }),
            );
            Ok(CoercedExpression {
                src_type,
                coerced_node: coerced,
                consider_type_changed: true,
                nexpr: true,
            })
        }
        Err(e) => Err(e),
    }
}

fn finish(ctx: &Context, expr: NodeId, src_type: NodeId, dst_type: NodeId, outcome: TypeCoercion) -> CoercedExpression {
    if outcome.promotes_into.is_some() {
        // The promotion itself still needs a wrapping node; lowering passes
        // in `bpc-resolve` construct the concrete `some(...)`/`ok(...)`
        // constructor ctor around `expr` using `outcome`'s target kind. Here
        // we only report that a change occurred so callers can react; the
        // wrap is produced by the caller since it knows which ctor variant
        // the runtime expects.
        let _ = dst_type;
        return CoercedExpression {
            src_type,
            coerced_node: expr,
            consider_type_changed: true,
            nexpr: false,
        };
    }
    let _ = ctx;
    CoercedExpression {
        src_type,
        coerced_node: expr,
        consider_type_changed: outcome.changed,
        nexpr: false,
    }
}

fn try_ctor_rule(
    ctx: &mut Context,
    expr: NodeId,
    ctor_id: NodeId,
    dst_type: NodeId,
    style: CoercionStyle,
) -> Result<Option<CoercedExpression>, CoerceError> {
    let ctor = match &ctx.node(ctor_id).kind {
        NodeKind::Ctor(c) => c.clone(),
        _ => panic!("node {ctor_id} is not a Ctor"),
    };
    let src_type_for_ctor = ctor_type_node(ctx, &ctor);

    match (&ctor, unqualified(ctx, dst_type)) {
        // Rule: integer literal to narrower integer if the value fits.
        (Ctor::Integer(value), UnqualifiedType::Integer { width, signed }) => {
            if integer_fits(*value, *width, *signed) {
                Ok(Some(CoercedExpression {
                    src_type: src_type_for_ctor.unwrap_or(dst_type),
                    coerced_node: expr,
                    consider_type_changed: true,
                    nexpr: false,
                }))
            } else {
                Err(CoerceError::IntegerOutOfRange {
                    value: *value,
                    width: *width,
                    signed: *signed,
                })
            }
        }

        // Rule: empty list literal coerces to any vector/list/set.
        (Ctor::List(items), UnqualifiedType::Vector(_) | UnqualifiedType::List(_) | UnqualifiedType::Set(_))
            if items.is_empty() =>
        {
            Ok(Some(CoercedExpression {
                src_type: dst_type,
                coerced_node: expr,
                consider_type_changed: true,
                nexpr: false,
            }))
        }

        // Rule: null coerces to optional/strong_ref/weak_ref only.
        (Ctor::Null, UnqualifiedType::Optional(_) | UnqualifiedType::StrongRef(_) | UnqualifiedType::WeakRef(_)) => {
            Ok(Some(CoercedExpression {
                src_type: dst_type,
                coerced_node: expr,
                consider_type_changed: true,
                nexpr: false,
            }))
        }
        (Ctor::Null, _) => Err(CoerceError::NullNotReferenceLike),

        // Rule: `error` value coerces to any `result<T>`.
        (Ctor::Error(_), UnqualifiedType::Result(_)) => Ok(Some(CoercedExpression {
            src_type: dst_type,
            coerced_node: expr,
            consider_type_changed: true,
            nexpr: false,
        })),

        // Rule: struct literal to declared struct type, field by field.
        (Ctor::Struct(fields), UnqualifiedType::Struct { fields: decl_fields }) => {
            let decl_fields = decl_fields.clone();
            for (name, _) in fields {
                let matches = decl_fields
                    .iter()
                    .any(|f| ctx.declaration(*f).header().id.local_name() == name.local_name());
                if !matches {
                    return Err(CoerceError::StructFieldMismatch {
                        field: name.as_str().to_string(),
                    });
                }
            }
            Ok(Some(CoercedExpression {
                src_type: dst_type,
                coerced_node: expr,
                consider_type_changed: true,
                nexpr: false,
            }))
        }

        _ => {
            let _ = style;
            Ok(None)
        }
    }
}

fn ctor_type_node(_ctx: &Context, ctor: &Ctor) -> Option<NodeId> {
    // Ctors don't carry an explicit type node of their own in this model;
    // their natural type is implied by the variant (handled by callers that
    // already know which destination matched). Reserved for a future
    // literal-type cache.
    let _ = ctor;
    None
}
