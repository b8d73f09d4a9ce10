//! Source locations: a file path paired with a byte span.
//!
//! Every diagnostic, and every context-managed declaration, anchors to a
//! `Location` so that errors can be reported and sorted by where they
//! occur in the source.

use crate::span::Span;
use std::fmt;

/// A location in a source file: which file, and which byte range within it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub file: String,
    pub span: Span,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<String>, span: Span) -> Self {
        Self {
            file: file.into(),
            span,
        }
    }

    /// A location with no useful span, used for synthetic/injected nodes.
    #[must_use]
    pub fn synthetic(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            span: Span::dummy(),
        }
    }

    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.span.is_dummy()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}", self.file, self.span)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_locations_have_dummy_span() {
        let loc = Location::synthetic("a.spicy");
        assert!(loc.is_synthetic());
        assert_eq!(format!("{loc}"), "a.spicy");
    }

    #[test]
    fn display_includes_span_for_real_locations() {
        let loc = Location::new("a.spicy", Span::new(4, 10));
        assert_eq!(format!("{loc}"), "a.spicy:4..10");
    }
}
