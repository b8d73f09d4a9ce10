//! Dot-separated qualified identifiers (`type::Name` / `expression::Name`'s `ID`).

use std::fmt;

/// A dot-separated path, e.g. `Greeting::hello` or a bare `x`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ID(String);

impl ID {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split("::")
    }

    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.0.contains("::")
    }

    /// The final path component, e.g. `hello` for `Greeting::hello`.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.components().last().unwrap_or(&self.0)
    }

    /// All but the final path component, e.g. `Greeting` for `Greeting::hello`.
    #[must_use]
    pub fn namespace(&self) -> Option<ID> {
        let mut parts: Vec<&str> = self.components().collect();
        if parts.len() <= 1 {
            return None;
        }
        parts.pop();
        Some(ID::new(parts.join("::")))
    }

    #[must_use]
    pub fn join(&self, child: &ID) -> ID {
        ID::new(format!("{}::{}", self.0, child.0))
    }
}

impl fmt::Display for ID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ID {
    fn from(s: &str) -> Self {
        ID::new(s)
    }
}

impl From<String> for ID {
    fn from(s: String) -> Self {
        ID::new(s)
    }
}
