//! The persistence component owning the connection lifecycle.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::Document;
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{MongoDbConfig, PersistenceOptions};
use crate::connect::{CredentialStore, Discovery, MongoDbConnectionResolver};
use crate::core::{
    Backend, BackendConnection, DocumentCollection, FindOptions, from_document, to_document,
};
use crate::error::{StateError, StorageResult};
use crate::types::{DataPage, PagingParams};

/// Lifecycle state of a persistence component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Not connected.
    Closed,
    /// Resolving the connection URI and connecting.
    Opening,
    /// Connected; operations are allowed.
    Open,
    /// Shutting the connection down.
    Closing,
}

enum ConnectionState {
    Closed,
    Opening,
    Open {
        connection: Box<dyn BackendConnection>,
        collection: Arc<dyn DocumentCollection>,
    },
    Closing,
}

impl ConnectionState {
    fn lifecycle(&self) -> LifecycleState {
        match self {
            ConnectionState::Closed => LifecycleState::Closed,
            ConnectionState::Opening => LifecycleState::Opening,
            ConnectionState::Open { .. } => LifecycleState::Open,
            ConnectionState::Closing => LifecycleState::Closing,
        }
    }
}

/// Resets the state to `Closed` unless the open attempt completed.
struct OpenAttempt<'a> {
    state: &'a RwLock<ConnectionState>,
    completed: bool,
}

impl<'a> OpenAttempt<'a> {
    fn begin(state: &'a RwLock<ConnectionState>) -> Self {
        *state.write() = ConnectionState::Opening;
        Self {
            state,
            completed: false,
        }
    }

    fn complete(mut self, connection: Box<dyn BackendConnection>) {
        let collection = connection.collection();
        *self.state.write() = ConnectionState::Open {
            connection,
            collection,
        };
        self.completed = true;
    }
}

impl Drop for OpenAttempt<'_> {
    fn drop(&mut self) {
        if !self.completed {
            *self.state.write() = ConnectionState::Closed;
        }
    }
}

/// Persistence component for entities of type `T` stored in one MongoDB
/// collection.
///
/// Owns the connection: the collection handle exists only while the
/// component is open, and every query fails with `StateError::NotOpened`
/// otherwise. [`open`](Self::open) and [`close`](Self::close) are serialized
/// by one async mutex; queries never wait on it.
///
/// The generic `*_by_query` operations take raw MongoDB filter documents.
/// For identifier-keyed CRUD see
/// [`IdentifiableMongoDbPersistence`](super::IdentifiableMongoDbPersistence).
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bson::doc;
/// use mongodb_persistence::backends::memory::MemoryBackend;
/// use mongodb_persistence::config::MongoDbConfig;
/// use mongodb_persistence::persistence::MongoDbPersistence;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Event {
///     kind: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut persistence: MongoDbPersistence<Event> =
///     MongoDbPersistence::new("events", Arc::new(MemoryBackend::new()));
/// persistence.configure(&MongoDbConfig::for_host("localhost", 27017, "test"));
/// persistence.open().await?;
///
/// persistence.create_document(Event { kind: "login".to_string() }).await?;
/// assert_eq!(persistence.get_count_by_query(doc! { "kind": "login" }).await?, 1);
///
/// persistence.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct MongoDbPersistence<T> {
    backend: Arc<dyn Backend>,
    collection_name: String,
    resolver: MongoDbConnectionResolver,
    options: PersistenceOptions,
    lifecycle: tokio::sync::Mutex<()>,
    state: RwLock<ConnectionState>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Debug for MongoDbPersistence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoDbPersistence")
            .field("backend", &self.backend.name())
            .field("collection", &self.collection_name)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T> MongoDbPersistence<T> {
    /// Creates a closed component for `collection`.
    pub fn new(collection: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            collection_name: collection.into(),
            resolver: MongoDbConnectionResolver::new(),
            options: PersistenceOptions::default(),
            lifecycle: tokio::sync::Mutex::new(()),
            state: RwLock::new(ConnectionState::Closed),
            _entity: PhantomData,
        }
    }

    /// Applies a configuration: connection and credential descriptors,
    /// options, and an optional collection name override.
    ///
    /// Takes effect on the next [`open`](Self::open).
    pub fn configure(&mut self, config: &MongoDbConfig) {
        if let Some(collection) = &config.collection {
            self.collection_name = collection.clone();
        }
        self.options = config.options.clone();
        self.resolver.configure(config);
    }

    /// Sets the discovery service used to resolve connection keys.
    pub fn set_discovery(&mut self, discovery: Arc<dyn Discovery>) {
        self.resolver.set_discovery(discovery);
    }

    /// Sets the credential store used to resolve credential keys.
    pub fn set_credential_store(&mut self, store: Arc<dyn CredentialStore>) {
        self.resolver.set_credential_store(store);
    }

    /// Returns the collection name.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Returns the active options.
    pub fn options(&self) -> &PersistenceOptions {
        &self.options
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.read().lifecycle()
    }

    /// Returns true while the component is open.
    pub fn is_open(&self) -> bool {
        self.state() == LifecycleState::Open
    }

    /// Returns the collection handle.
    ///
    /// # Errors
    ///
    /// `StateError::NotOpened` unless the component is open.
    pub fn collection(&self) -> StorageResult<Arc<dyn DocumentCollection>> {
        match &*self.state.read() {
            ConnectionState::Open { collection, .. } => Ok(Arc::clone(collection)),
            _ => Err(StateError::NotOpened.into()),
        }
    }

    /// Resolves the connection URI and connects. Does nothing if already open.
    ///
    /// # Errors
    ///
    /// * `StorageError::Config` - the connection configuration is incomplete
    /// * `StorageError::Connection` - the backend could not connect
    ///
    /// The component is left closed on every failure, and also when the
    /// returned future is dropped before completion.
    pub async fn open(&self) -> StorageResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_open() {
            return Ok(());
        }

        let attempt = OpenAttempt::begin(&self.state);
        let uri = self.resolver.resolve().await?;
        let connection = self
            .backend
            .connect(&uri, &self.collection_name, &self.options)
            .await?;

        tracing::debug!(
            backend = self.backend.name(),
            database = connection.database_name(),
            collection = %self.collection_name,
            "Opened persistence"
        );
        attempt.complete(connection);
        Ok(())
    }

    /// Closes the connection. Does nothing if already closed.
    ///
    /// The component ends closed even if shutting the connection down fails.
    pub async fn close(&self) -> StorageResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        let previous = std::mem::replace(&mut *self.state.write(), ConnectionState::Closing);
        let ConnectionState::Open { connection, .. } = previous else {
            *self.state.write() = ConnectionState::Closed;
            return Ok(());
        };

        let result = connection.close().await;
        *self.state.write() = ConnectionState::Closed;
        tracing::debug!(collection = %self.collection_name, "Closed persistence");
        result
    }

    /// Drops the collection with all its documents.
    pub async fn clear(&self) -> StorageResult<()> {
        let collection = self.collection()?;
        collection.drop_collection().await?;
        tracing::trace!(collection = %self.collection_name, "Cleared collection");
        Ok(())
    }

    /// Logs a composed query when the `debug` option is on.
    pub(crate) fn log_query(&self, operation: &str, filter: &Document, sort: Option<&Document>) {
        if self.options.debug {
            tracing::debug!(
                collection = %self.collection_name,
                operation,
                filter = %filter,
                sort = ?sort,
                "Composed query"
            );
        }
    }

    /// Returns the number of documents matching `filter`.
    pub async fn get_count_by_query(&self, filter: Document) -> StorageResult<u64> {
        let collection = self.collection()?;
        self.log_query("count", &filter, None);
        let count = collection.count(filter).await?;
        tracing::trace!(collection = %self.collection_name, count, "Counted items");
        Ok(count)
    }

    /// Deletes every document matching `filter`; returns how many.
    pub async fn delete_by_query(&self, filter: Document) -> StorageResult<u64> {
        let collection = self.collection()?;
        self.log_query("delete", &filter, None);
        let count = collection.delete_many(filter).await?;
        tracing::trace!(collection = %self.collection_name, count, "Deleted items");
        Ok(count)
    }
}

impl<T> MongoDbPersistence<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Returns one page of items matching `filter`.
    ///
    /// `skip` defaults to 0; `take` defaults to, and is capped by, the
    /// `max_page_size` option. The total is counted by a second query, only
    /// when requested, so it may drift from the page under concurrent writes.
    pub async fn get_page_by_query(
        &self,
        filter: Document,
        paging: Option<&PagingParams>,
        sort: Option<Document>,
    ) -> StorageResult<DataPage<T>> {
        let collection = self.collection()?;
        let paging = paging.cloned().unwrap_or_default();
        let skip = paging.skip_or(0);
        let take = paging.take_or(self.options.page_limit());

        self.log_query("page", &filter, sort.as_ref());
        let documents = collection
            .find(
                filter.clone(),
                FindOptions::default()
                    .with_sort(sort)
                    .with_skip(skip)
                    .with_limit(take),
            )
            .await?;
        let data = documents
            .into_iter()
            .map(from_document)
            .collect::<StorageResult<Vec<T>>>()?;

        let total = if paging.total {
            Some(collection.count(filter).await?)
        } else {
            None
        };

        tracing::trace!(
            collection = %self.collection_name,
            count = data.len(),
            "Retrieved page"
        );
        Ok(DataPage::new(data, total))
    }

    /// Returns every item matching `filter`, optionally sorted.
    pub async fn get_list_by_query(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> StorageResult<Vec<T>> {
        let collection = self.collection()?;
        self.log_query("list", &filter, sort.as_ref());
        let documents = collection
            .find(filter, FindOptions::default().with_sort(sort))
            .await?;
        let items = documents
            .into_iter()
            .map(from_document)
            .collect::<StorageResult<Vec<T>>>()?;

        tracing::trace!(
            collection = %self.collection_name,
            count = items.len(),
            "Retrieved list"
        );
        Ok(items)
    }

    /// Returns a random item matching `filter`, or `None` if nothing matches.
    ///
    /// The offset is drawn from `[0, count - 1)`, so with more than one
    /// match the last one in natural order is never picked.
    pub async fn get_one_random_by_query(&self, filter: Document) -> StorageResult<Option<T>> {
        let collection = self.collection()?;
        self.log_query("random", &filter, None);
        let count = collection.count(filter.clone()).await?;
        if count == 0 {
            tracing::trace!(collection = %self.collection_name, "Nothing found for random pick");
            return Ok(None);
        }

        let skip = if count > 1 {
            rand::thread_rng().gen_range(0..count - 1)
        } else {
            0
        };
        let document = collection
            .find(filter, FindOptions::default().with_skip(skip).with_limit(1))
            .await?
            .into_iter()
            .next();

        tracing::trace!(collection = %self.collection_name, skip, "Retrieved random item");
        document.map(from_document).transpose()
    }

    /// Inserts an item as a new document and returns it.
    pub async fn create_document(&self, item: T) -> StorageResult<T> {
        let collection = self.collection()?;
        collection.insert_one(to_document(&item)?).await?;
        tracing::trace!(collection = %self.collection_name, "Created item");
        Ok(item)
    }
}
