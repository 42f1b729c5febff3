//! Conversion between entities and stored documents.
//!
//! Entities carry their identifier in a field named `id`; documents carry it
//! in `_id`.

use bson::{Bson, Document};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageResult;

/// Primary key field of stored documents.
pub const ID_FIELD: &str = "_id";

/// Identifier field of entities.
pub const ENTITY_ID_FIELD: &str = "id";

/// Serializes an entity into a document, moving `id` to `_id`.
///
/// A missing or null `id` produces a document without `_id`.
pub fn to_document<T: Serialize>(item: &T) -> StorageResult<Document> {
    let mut fields = bson::to_document(item)?;
    let mut document = Document::new();
    match fields.remove(ENTITY_ID_FIELD) {
        Some(Bson::Null) | None => {}
        Some(id) => {
            document.insert(ID_FIELD, id);
        }
    }
    document.extend(fields);
    Ok(document)
}

/// Deserializes a document into an entity, moving `_id` to `id`.
pub fn from_document<T: DeserializeOwned>(mut document: Document) -> StorageResult<T> {
    if let Some(id) = document.remove(ID_FIELD) {
        document.insert(ENTITY_ID_FIELD, id);
    }
    Ok(bson::from_document(document)?)
}

/// Serializes an identifier into its BSON form.
pub fn id_to_bson<K: Serialize>(id: &K) -> StorageResult<Bson> {
    Ok(bson::to_bson(id)?)
}
