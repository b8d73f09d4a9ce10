//! Diagnostics collected during context-managed compilation passes.
//!
//! Every recoverable problem is attached as a `(message, location,
//! priority)` triple rather than raised immediately, so a single pass can
//! surface as many independent problems as possible. The reporter then
//! prints only the diagnostics at the *highest* priority level actually
//! present, sorted by location, to keep cascading noise down.
//!
//! Internal invariant violations are not diagnostics at all — callers
//! return a distinct `InternalError` instead, never collected alongside
//! ordinary diagnostics.

use crate::location::Location;
use std::cmp::Ordering;

/// How severe a diagnostic's presentation is, independent of its ranking
/// priority below. Most diagnostics are `Error`; a few compatibility
/// rewrites and grammar recovery situations emit `Warning` (an
/// attribute-only field silently rewritten to `skip bytes`, or a
/// `&synchronize` production with no terminal of its own).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

/// Which subsystem raised the diagnostic. Used mostly for test assertions
/// and grouped reporting; the reporter itself only cares about `priority`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticKind {
    /// Unresolved `Name` or `type::Name`.
    Lookup,
    /// Coercion failed in a position requiring it.
    TypeMismatch,
    /// Ambiguous look-ahead, missing synchronization terminal, unresolved cycle.
    Grammar,
    /// Unknown or ill-typed attribute.
    Attribute,
    /// Structural rule violation (duplicate switch case, bad hook signature, ...).
    Semantic,
}

/// Ranking priority used to decide what the reporter actually prints:
/// only the diagnostics at the highest level present, sorted by location
/// within that level. `High` ranks above `Normal` ranks above `Low`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Priority {
    Low,
    Normal,
    High,
}

/// A single collected diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub kind: DiagnosticKind,
    pub location: Location,
    pub message: String,
    pub priority: Priority,
}

impl Diagnostic {
    #[must_use]
    pub fn error(kind: DiagnosticKind, location: Location, message: impl Into<String>, priority: Priority) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            kind,
            location,
            message: message.into(),
            priority,
        }
    }

    #[must_use]
    pub fn warning(kind: DiagnosticKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Warning,
            kind,
            location,
            message: message.into(),
            priority: Priority::Low,
        }
    }
}

/// An append-only collection of diagnostics raised during one pass.
///
/// Node-attached error lists are gathered across a tree and then reduced
/// to "only the highest priority level actually present" for reporting.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticSet {
    entries: Vec<Diagnostic>,
}

impl DiagnosticSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: DiagnosticSet) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.category == DiagnosticCategory::Error)
    }

    /// Highest priority level present across every collected diagnostic, if any.
    #[must_use]
    pub fn highest_priority(&self) -> Option<Priority> {
        self.entries.iter().map(|d| d.priority).max()
    }

    /// The diagnostics the reporter should actually print: those at the
    /// highest priority level present, sorted by source location.
    #[must_use]
    pub fn reportable(&self) -> Vec<&Diagnostic> {
        let Some(highest) = self.highest_priority() else {
            return Vec::new();
        };

        let mut reportable: Vec<&Diagnostic> = self
            .entries
            .iter()
            .filter(|d| d.priority == highest)
            .collect();

        reportable.sort_by(|a, b| {
            a.location
                .file
                .cmp(&b.location.file)
                .then_with(|| cmp_span(a, b))
        });

        reportable
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

fn cmp_span(a: &Diagnostic, b: &Diagnostic) -> Ordering {
    a.location
        .span
        .start
        .cmp(&b.location.span.start)
        .then(a.location.span.end.cmp(&b.location.span.end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn loc(start: u32) -> Location {
        Location::new("a.spicy", Span::from_len(start, 1))
    }

    #[test]
    fn reportable_keeps_only_highest_priority() {
        let mut set = DiagnosticSet::new();
        set.push(Diagnostic::error(
            DiagnosticKind::Lookup,
            loc(10),
            "unresolved name 'Greeting'",
            Priority::High,
        ));
        set.push(Diagnostic::error(
            DiagnosticKind::TypeMismatch,
            loc(1),
            "int<8> out of range",
            Priority::Normal,
        ));

        let reportable = set.reportable();
        assert_eq!(reportable.len(), 1);
        assert_eq!(reportable[0].priority, Priority::High);
    }

    #[test]
    fn reportable_sorts_by_location_within_level() {
        let mut set = DiagnosticSet::new();
        set.push(Diagnostic::error(DiagnosticKind::Grammar, loc(50), "b", Priority::High));
        set.push(Diagnostic::error(DiagnosticKind::Grammar, loc(5), "a", Priority::High));

        let reportable = set.reportable();
        assert_eq!(reportable[0].message, "a");
        assert_eq!(reportable[1].message, "b");
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut set = DiagnosticSet::new();
        set.push(Diagnostic::warning(DiagnosticKind::Semantic, loc(0), "deprecated rewrite"));
        assert!(!set.has_errors());
    }
}
