//! Identifier capabilities for stored entities.

use std::fmt::Debug;

use bson::oid::ObjectId;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// An identifier type the persistence layer can mint on its own.
pub trait GeneratedId: Sized {
    /// Returns a new identifier that has never been issued before.
    fn generate() -> Self;
}

impl GeneratedId for String {
    /// A 32 character lowercase hex string (UUID v4 without dashes).
    fn generate() -> Self {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

impl GeneratedId for ObjectId {
    fn generate() -> Self {
        ObjectId::new()
    }
}

/// Bounds required of an identifier type.
pub trait EntityKey:
    GeneratedId + Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static
{
}

impl<K> EntityKey for K where
    K: GeneratedId + Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static
{
}

/// An entity with a mutable unique identifier.
///
/// The identifier is stored in the document's `_id` field; the entity must
/// serialize it under the field name `id`.
///
/// # Example
///
/// ```
/// use mongodb_persistence::core::Identifiable;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Beacon {
///     #[serde(default, skip_serializing_if = "Option::is_none")]
///     id: Option<String>,
///     udi: String,
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
/// let mut beacon = Beacon { id: None, udi: "00001".to_string() };
/// let id = beacon.ensure_id();
/// assert_eq!(beacon.id(), Some(&id));
/// ```
pub trait Identifiable<K> {
    /// Returns the identifier, if one has been assigned.
    fn id(&self) -> Option<&K>;

    /// Assigns the identifier.
    fn set_id(&mut self, id: K);

    /// Returns the identifier, generating and assigning one first if absent.
    fn ensure_id(&mut self) -> K
    where
        K: GeneratedId + Clone,
    {
        if let Some(id) = self.id() {
            return id.clone();
        }
        let id = K::generate();
        self.set_id(id.clone());
        id
    }
}
