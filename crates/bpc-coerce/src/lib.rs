//! Coercion engine: decides whether a source type/expression can stand in
//! for a destination type under a given [`CoercionStyle`], and if so
//! produces the (possibly wrapped) node that does.

pub mod engine;
pub mod error;
pub mod style;

pub use engine::{coerce_expression, coerce_operands, CoercedExpression};
pub use error::CoerceError;
pub use style::CoercionStyle;
