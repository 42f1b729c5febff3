//! Partial update maps.

use bson::{Bson, Document};

/// Field-level assignments applied to an existing document.
///
/// Keys are dot paths; each entry becomes a `$set` of that path, so fields
/// not named in the map are left untouched.
///
/// # Example
///
/// ```
/// use mongodb_persistence::types::UpdateMap;
///
/// let update = UpdateMap::new()
///     .with("content", "Modified Content")
///     .with("inner_dummy.description", "Modified description");
/// assert_eq!(update.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMap(Document);

impl UpdateMap {
    /// Creates an empty update map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment, replacing any previous one for the same path.
    pub fn with(mut self, path: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.insert(path, value);
        self
    }

    /// Inserts an assignment, replacing any previous one for the same path.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Bson>) {
        self.0.insert(path.into(), value.into());
    }

    /// Iterates over the assignments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bson)> {
        self.0.iter()
    }

    /// Returns the assignments as a document keyed by path.
    pub fn as_document(&self) -> &Document {
        &self.0
    }

    /// Returns the number of assignments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when there is nothing to assign.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Document> for UpdateMap {
    fn from(document: Document) -> Self {
        Self(document)
    }
}
