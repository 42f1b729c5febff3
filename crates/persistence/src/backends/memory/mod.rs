//! In-memory backend.
//!
//! Emulates a MongoDB server inside the process. Every connection made from
//! the same [`MemoryBackend`] value (or its clones) sees the same databases,
//! so data survives a close/open cycle the way it would on a server.

mod matcher;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use parking_lot::RwLock;

use crate::config::PersistenceOptions;
use crate::core::{
    Backend, BackendConnection, BackendKind, DocumentCollection, FindOptions, ID_FIELD,
};
use crate::error::{BackendError, ConnectionError, StorageResult};

use super::DEFAULT_DATABASE;
use matcher::{apply_update, compare_documents, matches};

const BACKEND_NAME: &str = "memory";

/// Documents keyed by `database.collection`.
type Namespaces = HashMap<String, Vec<Document>>;

/// Process-local backend speaking MongoDB query syntax.
///
/// # Example
///
/// ```
/// use mongodb_persistence::backends::memory::MemoryBackend;
///
/// let backend = MemoryBackend::new();
/// assert_eq!(backend.document_count("test", "dummies"), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    namespaces: Arc<RwLock<Namespaces>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents stored in a collection.
    pub fn document_count(&self, database: &str, collection: &str) -> usize {
        self.namespaces
            .read()
            .get(&namespace(database, collection))
            .map_or(0, Vec::len)
    }
}

fn namespace(database: &str, collection: &str) -> String {
    format!("{database}.{collection}")
}

/// Extracts the database name from a `mongodb://` URI.
fn database_from_uri(uri: &str) -> Result<String, String> {
    let rest = uri
        .strip_prefix("mongodb://")
        .or_else(|| uri.strip_prefix("mongodb+srv://"))
        .ok_or_else(|| format!("unsupported connection string scheme in '{uri}'"))?;
    let rest = rest.split_once('?').map_or(rest, |(head, _)| head);
    let rest = rest.rsplit_once('@').map_or(rest, |(_, hosts)| hosts);
    let (hosts, database) = rest.split_once('/').unwrap_or((rest, ""));
    if hosts.is_empty() {
        return Err(format!("no host in '{uri}'"));
    }
    Ok(if database.is_empty() {
        DEFAULT_DATABASE.to_string()
    } else {
        database.to_string()
    })
}

#[async_trait]
impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn connect(
        &self,
        uri: &str,
        collection: &str,
        _options: &PersistenceOptions,
    ) -> StorageResult<Box<dyn BackendConnection>> {
        let database = database_from_uri(uri).map_err(|message| ConnectionError::Failed {
            backend_name: BACKEND_NAME.to_string(),
            message,
            source: None,
        })?;

        tracing::debug!(database = %database, collection, "Opened in-memory collection");

        let collection = Arc::new(MemoryCollection {
            name: collection.to_string(),
            namespace: namespace(&database, collection),
            namespaces: Arc::clone(&self.namespaces),
        });
        Ok(Box::new(MemoryConnection {
            database,
            collection,
        }))
    }
}

#[derive(Debug)]
struct MemoryConnection {
    database: String,
    collection: Arc<MemoryCollection>,
}

#[async_trait]
impl BackendConnection for MemoryConnection {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn collection(&self) -> Arc<dyn DocumentCollection> {
        self.collection.clone()
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// A collection inside a [`MemoryBackend`].
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    namespace: String,
    namespaces: Arc<RwLock<Namespaces>>,
}

impl MemoryCollection {
    fn duplicate_key(&self, id: &Bson) -> crate::error::StorageError {
        let id = match id {
            Bson::String(s) => s.clone(),
            other => other.to_string(),
        };
        BackendError::DuplicateKey {
            collection: self.name.clone(),
            id,
        }
        .into()
    }

    fn ensure_unique(&self, documents: &[Document], id: &Bson) -> StorageResult<()> {
        if documents.iter().any(|d| d.get(ID_FIELD) == Some(id)) {
            return Err(self.duplicate_key(id));
        }
        Ok(())
    }
}

fn position(documents: &[Document], filter: &Document) -> StorageResult<Option<usize>> {
    for (index, document) in documents.iter().enumerate() {
        if matches(document, filter)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// Returns `document` with `_id` as its first field.
fn with_id(mut document: Document, id: Bson) -> Document {
    document.remove(ID_FIELD);
    let mut result = Document::new();
    result.insert(ID_FIELD, id);
    result.extend(document);
    result
}

/// Returns the `_id` a filter pins by plain equality, if any.
fn pinned_id(filter: &Document) -> Option<Bson> {
    match filter.get(ID_FIELD) {
        Some(Bson::Document(inner)) if inner.keys().any(|k| k.starts_with('$')) => None,
        other => other.cloned(),
    }
}

fn immutable_id(expected: &Bson, document: &Document) -> StorageResult<()> {
    match document.get(ID_FIELD) {
        Some(id) if id != expected => Err(BackendError::Internal {
            backend_name: BACKEND_NAME.to_string(),
            message: "field '_id' is immutable".to_string(),
        }
        .into()),
        _ => Ok(()),
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: Document, options: FindOptions) -> StorageResult<Vec<Document>> {
        let mut found = Vec::new();
        {
            let namespaces = self.namespaces.read();
            let documents = namespaces
                .get(&self.namespace)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for document in documents {
                if matches(document, &filter)? {
                    found.push(document.clone());
                }
            }
        }

        if let Some(sort) = &options.sort {
            found.sort_by(|a, b| compare_documents(a, b, sort));
        }
        let skip = options.skip.map_or(0, to_usize);
        let limit = options.limit.map_or(usize::MAX, to_usize);
        Ok(found.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, filter: Document) -> StorageResult<u64> {
        let namespaces = self.namespaces.read();
        let mut count = 0;
        for document in namespaces.get(&self.namespace).into_iter().flatten() {
            if matches(document, &filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert_one(&self, document: Document) -> StorageResult<()> {
        let id = document
            .get(ID_FIELD)
            .cloned()
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
        let document = with_id(document, id.clone());

        let mut namespaces = self.namespaces.write();
        let documents = namespaces.entry(self.namespace.clone()).or_default();
        self.ensure_unique(documents, &id)?;
        documents.push(document);
        Ok(())
    }

    async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> StorageResult<Option<Document>> {
        let mut namespaces = self.namespaces.write();
        let documents = namespaces.entry(self.namespace.clone()).or_default();

        match position(documents, &filter)? {
            Some(index) => {
                let id = documents[index]
                    .get(ID_FIELD)
                    .cloned()
                    .unwrap_or(Bson::Null);
                immutable_id(&id, &replacement)?;
                let replacement = with_id(replacement, id);
                documents[index] = replacement.clone();
                Ok(Some(replacement))
            }
            None if upsert => {
                let id = replacement
                    .get(ID_FIELD)
                    .cloned()
                    .or_else(|| pinned_id(&filter))
                    .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
                self.ensure_unique(documents, &id)?;
                let replacement = with_id(replacement, id);
                documents.push(replacement.clone());
                Ok(Some(replacement))
            }
            None => Ok(None),
        }
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> StorageResult<Option<Document>> {
        let mut namespaces = self.namespaces.write();
        let documents = namespaces.entry(self.namespace.clone()).or_default();

        let Some(index) = position(documents, &filter)? else {
            return Ok(None);
        };
        let mut updated = documents[index].clone();
        apply_update(&mut updated, &update)?;
        if let Some(id) = documents[index].get(ID_FIELD) {
            immutable_id(id, &updated)?;
        }
        documents[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn find_one_and_delete(&self, filter: Document) -> StorageResult<Option<Document>> {
        let mut namespaces = self.namespaces.write();
        let Some(documents) = namespaces.get_mut(&self.namespace) else {
            return Ok(None);
        };
        Ok(position(documents, &filter)?.map(|index| documents.remove(index)))
    }

    async fn delete_many(&self, filter: Document) -> StorageResult<u64> {
        let mut namespaces = self.namespaces.write();
        let Some(documents) = namespaces.get_mut(&self.namespace) else {
            return Ok(0);
        };

        let doomed = documents
            .iter()
            .map(|document| matches(document, &filter))
            .collect::<StorageResult<Vec<bool>>>()?;
        let mut flags = doomed.iter();
        documents.retain(|_| !flags.next().copied().unwrap_or(false));
        Ok(doomed.iter().filter(|d| **d).count() as u64)
    }

    async fn drop_collection(&self) -> StorageResult<()> {
        self.namespaces.write().remove(&self.namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::error::StorageError;

    async fn open(backend: &MemoryBackend) -> Arc<dyn DocumentCollection> {
        backend
            .connect(
                "mongodb://localhost:27017/test",
                "items",
                &PersistenceOptions::default(),
            )
            .await
            .unwrap()
            .collection()
    }

    #[test]
    fn test_database_from_uri() {
        assert_eq!(database_from_uri("mongodb://localhost:27017/app").unwrap(), "app");
        assert_eq!(
            database_from_uri("mongodb://u:p@a:1,b:2/app?replicaSet=rs0").unwrap(),
            "app"
        );
        assert_eq!(database_from_uri("mongodb://localhost").unwrap(), "test");
        assert!(database_from_uri("postgres://localhost/app").is_err());
        assert!(database_from_uri("mongodb:///app").is_err());
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_uri() {
        let err = MemoryBackend::new()
            .connect("http://localhost", "items", &PersistenceOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let backend = MemoryBackend::new();
        let collection = open(&backend).await;

        collection.insert_one(doc! { "_id": "1", "n": 2 }).await.unwrap();
        collection.insert_one(doc! { "_id": "2", "n": 1 }).await.unwrap();
        collection.insert_one(doc! { "n": 3 }).await.unwrap();

        assert_eq!(backend.document_count("test", "items"), 3);
        assert_eq!(collection.count(doc! {}).await.unwrap(), 3);

        let sorted = collection
            .find(
                doc! {},
                FindOptions::default()
                    .with_sort(Some(doc! { "n": 1 }))
                    .with_skip(1)
                    .with_limit(1),
            )
            .await
            .unwrap();
        assert_eq!(sorted, vec![doc! { "_id": "1", "n": 2 }]);
    }

    #[tokio::test]
    async fn test_duplicate_key() {
        let collection = open(&MemoryBackend::new()).await;
        collection.insert_one(doc! { "_id": "1" }).await.unwrap();
        let err = collection.insert_one(doc! { "_id": "1" }).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::DuplicateKey { ref id, .. }) if id == "1"
        ));
    }

    #[tokio::test]
    async fn test_replace_and_upsert() {
        let collection = open(&MemoryBackend::new()).await;

        let missed = collection
            .find_one_and_replace(doc! { "_id": "1" }, doc! { "n": 1 }, false)
            .await
            .unwrap();
        assert!(missed.is_none());
        assert_eq!(collection.count(doc! {}).await.unwrap(), 0);

        let inserted = collection
            .find_one_and_replace(doc! { "_id": "1" }, doc! { "n": 1, "old": true }, true)
            .await
            .unwrap();
        assert_eq!(inserted, Some(doc! { "_id": "1", "n": 1, "old": true }));

        let replaced = collection
            .find_one_and_replace(doc! { "_id": "1" }, doc! { "_id": "1", "n": 2 }, true)
            .await
            .unwrap();
        assert_eq!(replaced, Some(doc! { "_id": "1", "n": 2 }));

        let err = collection
            .find_one_and_replace(doc! { "_id": "1" }, doc! { "_id": "2" }, false)
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let collection = open(&MemoryBackend::new()).await;
        collection
            .insert_one(doc! { "_id": "1", "a": { "b": 1, "c": 2 } })
            .await
            .unwrap();
        collection.insert_one(doc! { "_id": "2" }).await.unwrap();
        collection.insert_one(doc! { "_id": "3" }).await.unwrap();

        let updated = collection
            .find_one_and_update(doc! { "_id": "1" }, doc! { "$set": { "a.b": 5 } })
            .await
            .unwrap();
        assert_eq!(updated, Some(doc! { "_id": "1", "a": { "b": 5, "c": 2 } }));

        let missing = collection
            .find_one_and_update(doc! { "_id": "9" }, doc! { "$set": { "a": 1 } })
            .await
            .unwrap();
        assert!(missing.is_none());

        let deleted = collection
            .find_one_and_delete(doc! { "_id": "2" })
            .await
            .unwrap();
        assert_eq!(deleted, Some(doc! { "_id": "2" }));

        let count = collection
            .delete_many(doc! { "_id": { "$in": ["1", "3", "9"] } })
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(collection.count(doc! {}).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connections_share_data_and_drop() {
        let backend = MemoryBackend::new();
        let first = open(&backend).await;
        first.insert_one(doc! { "_id": "1" }).await.unwrap();

        let second = open(&backend.clone()).await;
        assert_eq!(second.count(doc! {}).await.unwrap(), 1);

        second.drop_collection().await.unwrap();
        assert_eq!(first.count(doc! {}).await.unwrap(), 0);
        assert_eq!(backend.document_count("test", "items"), 0);
    }
}
