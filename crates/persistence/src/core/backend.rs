//! Backend abstraction for database drivers.
//!
//! This module defines the [`Backend`] trait, which hides the database driver
//! behind a connect call returning a [`BackendConnection`]. Each backend
//! implements this trait to provide driver-specific connection handling.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PersistenceOptions;
use crate::error::StorageResult;

use super::DocumentCollection;

/// Identifies the type of database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// MongoDB (document store).
    MongoDB,
    /// Process-local in-memory store.
    Memory,
    /// Custom or unknown backend.
    Custom(&'static str),
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::MongoDB => write!(f, "mongodb"),
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// A database backend that can open connections to a collection.
///
/// The `Backend` trait is object-safe, so a persistence component holds an
/// `Arc<dyn Backend>` and can be pointed at a different driver without
/// changing its type.
///
/// # Example
///
/// ```
/// use mongodb_persistence::backends::memory::MemoryBackend;
/// use mongodb_persistence::config::PersistenceOptions;
/// use mongodb_persistence::core::{Backend, BackendKind};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::new();
/// assert_eq!(backend.kind(), BackendKind::Memory);
///
/// let connection = backend
///     .connect("mongodb://localhost:27017/test", "dummies", &PersistenceOptions::default())
///     .await?;
/// assert_eq!(connection.database_name(), "test");
/// connection.close().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;

    /// Connects to the database named by `uri` and opens `collection`.
    ///
    /// Failures surface as `StorageError::Connection`.
    async fn connect(
        &self,
        uri: &str,
        collection: &str,
        options: &PersistenceOptions,
    ) -> StorageResult<Box<dyn BackendConnection>>;
}

/// An established connection owning a collection handle.
#[async_trait]
pub trait BackendConnection: Send + Sync + Debug {
    /// Returns the name of the connected database.
    fn database_name(&self) -> &str;

    /// Returns the collection handle.
    fn collection(&self) -> Arc<dyn DocumentCollection>;

    /// Shuts the connection down.
    async fn close(&self) -> StorageResult<()>;
}
