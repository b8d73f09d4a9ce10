//! The bitmask selecting which coercion rules are enabled at a call site.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Composed at each call site: assignment, function-call argument
    /// binding, ternary unification, and operand matching in the operator
    /// registry each assemble their own combination.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CoercionStyle: u32 {
        /// Accept only identical types (modulo the constness rule below).
        const TRY_EXACT_MATCH = 1 << 0;
        /// Accept differences in constness.
        const TRY_CONST_PROMOTION = 1 << 1;
        /// Attempt a real value conversion.
        const TRY_COERCION = 1 << 2;
        /// The left-hand side must be mutable.
        const ASSIGNMENT = 1 << 3;
        /// The call site must match declared parameter kinds (`in`/`inout`/`copy`).
        const FUNCTION_CALL = 1 << 4;
        /// Used by the operator-overload resolver; additionally disallows
        /// silently promoting a constant expression to a mutable operand.
        const OPERAND_MATCHING = 1 << 5;
        /// Enables truthiness conversions (integer, optional, enum, reference,
        /// interval, union, time, result → bool).
        const CONTEXTUAL_CONVERSION = 1 << 6;
        /// At most one operand may change its primary type; prevents
        /// ambiguous overload resolution.
        const DISALLOW_TYPE_CHANGES = 1 << 7;
        /// Internal marker set while recursing into a parameterized type's
        /// arguments, so tailored ctor rules don't re-trigger top-level-only
        /// behavior.
        const RECURSING = 1 << 8;
    }
}

impl Default for CoercionStyle {
    fn default() -> Self {
        CoercionStyle::TRY_EXACT_MATCH
    }
}

impl fmt::Display for CoercionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: &[(CoercionStyle, &str)] = &[
            (CoercionStyle::TRY_EXACT_MATCH, "TryExactMatch"),
            (CoercionStyle::TRY_CONST_PROMOTION, "TryConstPromotion"),
            (CoercionStyle::TRY_COERCION, "TryCoercion"),
            (CoercionStyle::ASSIGNMENT, "Assignment"),
            (CoercionStyle::FUNCTION_CALL, "FunctionCall"),
            (CoercionStyle::OPERAND_MATCHING, "OperandMatching"),
            (CoercionStyle::CONTEXTUAL_CONVERSION, "ContextualConversion"),
            (CoercionStyle::DISALLOW_TYPE_CHANGES, "DisallowTypeChanges"),
            (CoercionStyle::RECURSING, "_Recursing"),
        ];

        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(*flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "(none)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_flag_names_with_pipe() {
        let style = CoercionStyle::ASSIGNMENT | CoercionStyle::TRY_COERCION;
        assert_eq!(style.to_string(), "TryCoercion|Assignment");
    }

    #[test]
    fn display_empty_style_is_none() {
        assert_eq!(CoercionStyle::empty().to_string(), "(none)");
    }
}
