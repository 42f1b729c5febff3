//! Driver-backed document collection.

use ::mongodb::Collection;
use ::mongodb::bson::Document;
use ::mongodb::options::ReturnDocument;
use async_trait::async_trait;
use futures::TryStreamExt;

use crate::core::{DocumentCollection, FindOptions};
use crate::error::StorageResult;

/// A MongoDB collection of raw documents.
#[derive(Debug, Clone)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

impl MongoCollection {
    /// Wraps a driver collection handle.
    pub fn new(inner: Collection<Document>) -> Self {
        Self { inner }
    }

    /// Returns the driver collection handle.
    pub fn inner(&self) -> &Collection<Document> {
        &self.inner
    }
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find(&self, filter: Document, options: FindOptions) -> StorageResult<Vec<Document>> {
        let mut find = self.inner.find(filter);
        if let Some(sort) = options.sort {
            find = find.sort(sort);
        }
        if let Some(skip) = options.skip {
            find = find.skip(skip);
        }
        if let Some(limit) = options.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let cursor = find.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, filter: Document) -> StorageResult<u64> {
        Ok(self.inner.count_documents(filter).await?)
    }

    async fn insert_one(&self, document: Document) -> StorageResult<()> {
        self.inner.insert_one(document).await?;
        Ok(())
    }

    async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> StorageResult<Option<Document>> {
        Ok(self
            .inner
            .find_one_and_replace(filter, replacement)
            .upsert(upsert)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> StorageResult<Option<Document>> {
        Ok(self
            .inner
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn find_one_and_delete(&self, filter: Document) -> StorageResult<Option<Document>> {
        Ok(self.inner.find_one_and_delete(filter).await?)
    }

    async fn delete_many(&self, filter: Document) -> StorageResult<u64> {
        Ok(self.inner.delete_many(filter).await?.deleted_count)
    }

    async fn drop_collection(&self) -> StorageResult<()> {
        Ok(self.inner.drop().await?)
    }
}
