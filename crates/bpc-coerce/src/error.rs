//! Coercion failure reasons. Not diagnostics themselves — callers (the
//! resolver, the operator registry) turn a `CoerceError` into a
//! `Diagnostic` at the call site, since only the caller knows which
//! declaration to attach it to.

use crate::style::CoercionStyle;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoerceError {
    /// Source and destination both carry a type identity and they differ.
    TypeMismatch,
    /// No rule enabled by `style` could bridge source and destination.
    NoApplicableRule { style: CoercionStyle },
    /// An integer literal does not fit the destination width.
    IntegerOutOfRange { value: i128, width: u8, signed: bool },
    /// A null ctor coerced to a non-reference, non-optional destination.
    NullNotReferenceLike,
    /// A struct literal is missing a required field, or names one the
    /// destination struct does not declare.
    StructFieldMismatch { field: String },
    /// More than one operand's primary type would change under
    /// `OperandMatching`, or the style forbids it outright.
    AmbiguousTypeChange,
}

impl fmt::Display for CoerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoerceError::TypeMismatch => write!(f, "source and destination types differ"),
            CoerceError::NoApplicableRule { style } => {
                write!(f, "no coercion rule under style {style} applies")
            }
            CoerceError::IntegerOutOfRange { value, width, signed } => {
                let kind = if *signed { "int" } else { "uint" };
                write!(f, "integer {value} out of range for {kind}<{width}>")
            }
            CoerceError::NullNotReferenceLike => {
                write!(f, "null does not coerce to a non-reference, non-optional type")
            }
            CoerceError::StructFieldMismatch { field } => {
                write!(f, "struct literal field '{field}' does not match the destination type")
            }
            CoerceError::AmbiguousTypeChange => {
                write!(f, "more than one operand would change type; overload resolution is ambiguous")
            }
        }
    }
}

impl std::error::Error for CoerceError {}
