//! Filter criteria for queries.

use std::collections::BTreeMap;

use bson::Bson;
use serde::{Deserialize, Serialize};

/// Reserved filter key that selects documents by identifier.
pub const IDS_FILTER_KEY: &str = "ids";

/// Key/value filter criteria.
///
/// Keys are field names, with dot paths addressing nested fields
/// (`inner_dummy.name`). Values are scalars compared with their BSON type,
/// so `5` matches an integer field and `"5"` a string field. A string value
/// with more than one comma-separated token denotes set membership; any
/// other value denotes equality. The reserved key [`IDS_FILTER_KEY`] filters
/// on the primary key.
///
/// # Example
///
/// ```
/// use mongodb_persistence::types::FilterParams;
///
/// let filter = FilterParams::from_tuples([("key", "Key 1"), ("ids", "1,2")])
///     .with("count", 5)
///     .with("active", true);
/// assert_eq!(filter.get_str("key"), Some("Key 1"));
/// assert_eq!(filter.len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterParams(BTreeMap<String, Bson>);

impl FilterParams {
    /// Creates empty criteria that match every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds criteria from key/value pairs. Later duplicates win.
    pub fn from_tuples<K, V>(tuples: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Bson>,
    {
        Self(
            tuples
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Parses `key=value` pairs separated by `;`. Values stay strings.
    ///
    /// Pairs without `=` are ignored.
    pub fn parse(query: &str) -> Self {
        Self::from_tuples(query.split(';').filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        }))
    }

    /// Adds a criterion, replacing any previous value for the key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a criterion, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Bson>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value for a key.
    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.0.get(key)
    }

    /// Returns the value for a key if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Bson::as_str)
    }

    /// Returns the comma-separated tokens of a string value, trimmed and
    /// non-empty.
    pub fn get_list(&self, key: &str) -> Option<Vec<&str>> {
        self.get_str(key).map(split_list)
    }

    /// Iterates over the criteria in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bson)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of criteria.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no criteria are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Splits a comma-separated value into trimmed, non-empty tokens.
pub(crate) fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}
