//! Identifier-keyed CRUD over a [`MongoDbPersistence`].

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::Bson;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::MongoDbConfig;
use crate::connect::{CredentialStore, Discovery};
use crate::core::{
    Backend, EntityKey, FindOptions, Identifiable, compose_filter, compose_id_filter,
    compose_ids_filter, compose_sort, compose_update, from_document, id_to_bson, to_document,
};
use crate::error::StorageResult;
use crate::types::{DataPage, FilterParams, PagingParams, SortParams, UpdateMap};

use super::{LifecycleState, MongoDbPersistence};

/// CRUD persistence for entities with a unique identifier of type `K`.
///
/// The identifier is stored as the document `_id`. Where an operation needs
/// an identifier and the item has none, a fresh one is generated with
/// [`GeneratedId`](crate::core::GeneratedId).
///
/// Filters are [`FilterParams`]: `key=value` means equality on the value's
/// BSON type, a comma-separated string means membership, and `ids` selects
/// identifiers.
/// Without a sort, results come in the store's natural order, which callers
/// must not rely on.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mongodb_persistence::backends::memory::MemoryBackend;
/// use mongodb_persistence::config::MongoDbConfig;
/// use mongodb_persistence::core::Identifiable;
/// use mongodb_persistence::persistence::IdentifiableMongoDbPersistence;
/// use mongodb_persistence::types::{FilterParams, PagingParams};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Beacon {
///     #[serde(default, skip_serializing_if = "Option::is_none")]
///     id: Option<String>,
///     site_id: String,
/// }
///
/// impl Identifiable<String> for Beacon {
///     fn id(&self) -> Option<&String> {
///         self.id.as_ref()
///     }
///
///     fn set_id(&mut self, id: String) {
///         self.id = Some(id);
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut persistence: IdentifiableMongoDbPersistence<Beacon, String> =
///     IdentifiableMongoDbPersistence::new("beacons", Arc::new(MemoryBackend::new()));
/// persistence.configure(&MongoDbConfig::for_host("localhost", 27017, "test"));
/// persistence.open().await?;
///
/// let beacon = persistence
///     .create(Beacon { id: None, site_id: "1".to_string() })
///     .await?;
/// let page = persistence
///     .get_page_by_filter(
///         &FilterParams::from_tuples([("site_id", "1")]),
///         Some(&PagingParams::default().with_total()),
///         None,
///     )
///     .await?;
/// assert_eq!(page.total, Some(1));
///
/// persistence.delete_by_id(beacon.id.as_ref().unwrap()).await?;
/// persistence.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct IdentifiableMongoDbPersistence<T, K> {
    base: MongoDbPersistence<T>,
    _key: PhantomData<fn() -> K>,
}

impl<T, K> Debug for IdentifiableMongoDbPersistence<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifiableMongoDbPersistence")
            .field("base", &self.base)
            .finish()
    }
}

impl<T, K> IdentifiableMongoDbPersistence<T, K> {
    /// Creates a closed component for `collection`.
    pub fn new(collection: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            base: MongoDbPersistence::new(collection, backend),
            _key: PhantomData,
        }
    }

    /// Returns the underlying component, for the generic `*_by_query`
    /// operations.
    pub fn base(&self) -> &MongoDbPersistence<T> {
        &self.base
    }

    /// See [`MongoDbPersistence::configure`].
    pub fn configure(&mut self, config: &MongoDbConfig) {
        self.base.configure(config);
    }

    /// See [`MongoDbPersistence::set_discovery`].
    pub fn set_discovery(&mut self, discovery: Arc<dyn Discovery>) {
        self.base.set_discovery(discovery);
    }

    /// See [`MongoDbPersistence::set_credential_store`].
    pub fn set_credential_store(&mut self, store: Arc<dyn CredentialStore>) {
        self.base.set_credential_store(store);
    }

    /// See [`MongoDbPersistence::open`].
    pub async fn open(&self) -> StorageResult<()> {
        self.base.open().await
    }

    /// See [`MongoDbPersistence::close`].
    pub async fn close(&self) -> StorageResult<()> {
        self.base.close().await
    }

    /// See [`MongoDbPersistence::is_open`].
    pub fn is_open(&self) -> bool {
        self.base.is_open()
    }

    /// See [`MongoDbPersistence::state`].
    pub fn state(&self) -> LifecycleState {
        self.base.state()
    }

    /// See [`MongoDbPersistence::clear`].
    pub async fn clear(&self) -> StorageResult<()> {
        self.base.clear().await
    }
}

fn is_blank_id(id: &Bson) -> bool {
    match id {
        Bson::Null => true,
        Bson::String(s) => s.is_empty(),
        _ => false,
    }
}

impl<T, K> IdentifiableMongoDbPersistence<T, K>
where
    T: Identifiable<K> + Serialize + DeserializeOwned + Send + Sync,
    K: EntityKey,
{
    fn collection_name(&self) -> &str {
        self.base.collection_name()
    }

    /// Returns the item with the given identifier, if any.
    pub async fn get_one_by_id(&self, id: &K) -> StorageResult<Option<T>> {
        let collection = self.base.collection()?;
        let filter = compose_id_filter(id_to_bson(id)?);
        let document = collection
            .find(filter, FindOptions::default().with_limit(1))
            .await?
            .into_iter()
            .next();

        match &document {
            Some(_) => tracing::trace!(collection = self.collection_name(), id = ?id, "Retrieved item"),
            None => tracing::trace!(collection = self.collection_name(), id = ?id, "Nothing found"),
        }
        document.map(from_document).transpose()
    }

    /// Returns the items whose identifiers are in `ids`.
    ///
    /// Missing identifiers are skipped. The result order is not guaranteed
    /// to follow `ids`.
    pub async fn get_list_by_ids(&self, ids: &[K]) -> StorageResult<Vec<T>> {
        let filter = compose_ids_filter(ids.iter().map(id_to_bson).collect::<StorageResult<_>>()?);
        self.base.get_list_by_query(filter, None).await
    }

    /// Returns one page of items matching `filter`.
    ///
    /// See [`MongoDbPersistence::get_page_by_query`] for paging defaults.
    pub async fn get_page_by_filter(
        &self,
        filter: &FilterParams,
        paging: Option<&PagingParams>,
        sort: Option<&SortParams>,
    ) -> StorageResult<DataPage<T>> {
        self.base
            .get_page_by_query(compose_filter(filter), paging, sort.and_then(compose_sort))
            .await
    }

    /// Returns every item matching `filter`, optionally sorted.
    pub async fn get_list_by_filter(
        &self,
        filter: &FilterParams,
        sort: Option<&SortParams>,
    ) -> StorageResult<Vec<T>> {
        self.base
            .get_list_by_query(compose_filter(filter), sort.and_then(compose_sort))
            .await
    }

    /// Returns the number of items matching `filter`.
    pub async fn get_count_by_filter(&self, filter: &FilterParams) -> StorageResult<u64> {
        self.base.get_count_by_query(compose_filter(filter)).await
    }

    /// Returns a random item matching `filter`.
    ///
    /// See [`MongoDbPersistence::get_one_random_by_query`].
    pub async fn get_one_random(&self, filter: &FilterParams) -> StorageResult<Option<T>> {
        self.base.get_one_random_by_query(compose_filter(filter)).await
    }

    /// Inserts an item, generating its identifier if absent.
    ///
    /// # Errors
    ///
    /// Fails with a backend error when the identifier is already taken.
    pub async fn create(&self, mut item: T) -> StorageResult<T> {
        let collection = self.base.collection()?;
        let id = item.ensure_id();
        collection.insert_one(to_document(&item)?).await?;

        tracing::trace!(collection = self.collection_name(), id = ?id, "Created item");
        Ok(item)
    }

    /// Inserts or fully replaces an item by identifier, generating the
    /// identifier if absent. Returns the stored item.
    pub async fn set(&self, mut item: T) -> StorageResult<T> {
        let collection = self.base.collection()?;
        let id = item.ensure_id();
        let filter = compose_id_filter(id_to_bson(&id)?);
        let stored = collection
            .find_one_and_replace(filter, to_document(&item)?, true)
            .await?;

        tracing::trace!(collection = self.collection_name(), id = ?id, "Set item");
        match stored {
            Some(document) => from_document(document),
            None => Ok(item),
        }
    }

    /// Replaces an existing item by identifier. Never inserts.
    ///
    /// An item without an identifier gets a freshly generated one first,
    /// which cannot match anything, so such a call always returns `None`.
    pub async fn update(&self, mut item: T) -> StorageResult<Option<T>> {
        let collection = self.base.collection()?;
        let id = item.ensure_id();
        let filter = compose_id_filter(id_to_bson(&id)?);
        let stored = collection
            .find_one_and_replace(filter, to_document(&item)?, false)
            .await?;

        match &stored {
            Some(_) => tracing::trace!(collection = self.collection_name(), id = ?id, "Updated item"),
            None => tracing::trace!(collection = self.collection_name(), id = ?id, "Nothing to update"),
        }
        stored.map(from_document).transpose()
    }

    /// Assigns only the given dot-path fields of an existing item.
    ///
    /// Returns `None` without contacting the store when `update` is empty or
    /// the identifier is blank, and `None` when no item has the identifier.
    pub async fn update_partially(&self, id: &K, update: &UpdateMap) -> StorageResult<Option<T>> {
        let collection = self.base.collection()?;
        let id_value = id_to_bson(id)?;
        if update.is_empty() || is_blank_id(&id_value) {
            return Ok(None);
        }

        let stored = collection
            .find_one_and_update(compose_id_filter(id_value), compose_update(update))
            .await?;

        tracing::trace!(
            collection = self.collection_name(),
            id = ?id,
            fields = update.len(),
            found = stored.is_some(),
            "Partially updated item"
        );
        stored.map(from_document).transpose()
    }

    /// Deletes an item by identifier and returns it, or `None` if absent.
    pub async fn delete_by_id(&self, id: &K) -> StorageResult<Option<T>> {
        let collection = self.base.collection()?;
        let deleted = collection
            .find_one_and_delete(compose_id_filter(id_to_bson(id)?))
            .await?;

        tracing::trace!(
            collection = self.collection_name(),
            id = ?id,
            found = deleted.is_some(),
            "Deleted item"
        );
        deleted.map(from_document).transpose()
    }

    /// Deletes every item matching `filter`.
    pub async fn delete_by_filter(&self, filter: &FilterParams) -> StorageResult<()> {
        self.base.delete_by_query(compose_filter(filter)).await?;
        Ok(())
    }

    /// Deletes every item whose identifier is in `ids`.
    pub async fn delete_by_ids(&self, ids: &[K]) -> StorageResult<()> {
        let filter = compose_ids_filter(ids.iter().map(id_to_bson).collect::<StorageResult<_>>()?);
        self.base.delete_by_query(filter).await?;
        Ok(())
    }
}
