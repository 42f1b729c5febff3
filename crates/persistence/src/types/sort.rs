//! Sort specifications.

use serde::{Deserialize, Serialize};

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Field name (dot paths allowed).
    pub name: String,
    /// Sort direction.
    pub ascending: bool,
}

impl SortField {
    /// Creates an ascending sort key.
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ascending: true,
        }
    }

    /// Creates a descending sort key.
    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ascending: false,
        }
    }

    /// Parses a field with an optional `-` (descending) or `+` prefix.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.strip_prefix('-') {
            Some(name) => Self::desc(name),
            None => Self::asc(s.strip_prefix('+').unwrap_or(s)),
        }
    }
}

/// An ordered list of sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortParams(Vec<SortField>);

impl SortParams {
    /// Creates an empty sort (natural order).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list such as `"key,-create_time_utc"`.
    pub fn parse(s: &str) -> Self {
        Self(
            s.split(',')
                .filter(|part| !part.trim().is_empty())
                .map(SortField::parse)
                .collect(),
        )
    }

    /// Appends a sort key.
    pub fn with(mut self, field: SortField) -> Self {
        self.0.push(field);
        self
    }

    /// Iterates over the sort keys in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &SortField> {
        self.0.iter()
    }

    /// Returns true when no sort keys are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<SortField> for SortParams {
    fn from_iter<I: IntoIterator<Item = SortField>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
