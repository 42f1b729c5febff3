//! The document collection seam between the persistence components and a
//! database driver.

use std::fmt::Debug;

use async_trait::async_trait;
use bson::Document;

use crate::error::StorageResult;

/// Options for [`DocumentCollection::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort document (`{field: 1 | -1, ...}`); natural order when `None`.
    pub sort: Option<Document>,
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Sets the sort document.
    pub fn with_sort(mut self, sort: Option<Document>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the number of documents to skip.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// An opened collection of BSON documents.
///
/// Filters, sorts and updates use MongoDB query syntax. Implementations
/// issue exactly one request per call and add no retries.
#[async_trait]
pub trait DocumentCollection: Send + Sync + Debug {
    /// Returns the collection name.
    fn name(&self) -> &str;

    /// Returns the documents matching `filter`.
    async fn find(&self, filter: Document, options: FindOptions) -> StorageResult<Vec<Document>>;

    /// Counts the documents matching `filter`.
    async fn count(&self, filter: Document) -> StorageResult<u64>;

    /// Inserts a document.
    ///
    /// Fails when `_id` is already taken: `BackendError::DuplicateKey` from
    /// the in-memory backend, `BackendError::Driver` from the driver.
    async fn insert_one(&self, document: Document) -> StorageResult<()>;

    /// Replaces the first document matching `filter` and returns the new
    /// version. With `upsert`, inserts `replacement` when nothing matches.
    async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> StorageResult<Option<Document>>;

    /// Applies an update document (`{$set: {...}}`) to the first document
    /// matching `filter` and returns the new version. Never upserts.
    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> StorageResult<Option<Document>>;

    /// Deletes the first document matching `filter` and returns it.
    async fn find_one_and_delete(&self, filter: Document) -> StorageResult<Option<Document>>;

    /// Deletes every document matching `filter`; returns how many.
    async fn delete_many(&self, filter: Document) -> StorageResult<u64>;

    /// Drops the collection with all its documents.
    async fn drop_collection(&self) -> StorageResult<()>;
}
