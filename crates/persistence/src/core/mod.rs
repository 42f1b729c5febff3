//! Core persistence traits and abstractions.
//!
//! - [`Backend`], [`BackendConnection`] - Database driver abstraction
//! - [`DocumentCollection`] - An opened collection of BSON documents
//! - [`Identifiable`], [`GeneratedId`] - Entity identifier capabilities
//! - [`compose_filter`], [`compose_sort`], [`compose_update`] - Query composition
//! - [`to_document`], [`from_document`] - Entity/document conversion
//!
//! # Example: Implementing a Backend
//!
//! ```ignore
//! use async_trait::async_trait;
//! use mongodb_persistence::config::PersistenceOptions;
//! use mongodb_persistence::core::{Backend, BackendConnection, BackendKind};
//! use mongodb_persistence::error::StorageResult;
//!
//! #[derive(Debug)]
//! struct MyBackend;
//!
//! #[async_trait]
//! impl Backend for MyBackend {
//!     fn kind(&self) -> BackendKind {
//!         BackendKind::Custom("my-backend")
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "my-backend"
//!     }
//!
//!     async fn connect(
//!         &self,
//!         uri: &str,
//!         collection: &str,
//!         options: &PersistenceOptions,
//!     ) -> StorageResult<Box<dyn BackendConnection>> {
//!         // ... driver-specific connection handling
//!         todo!()
//!     }
//! }
//! ```

mod backend;
mod collection;
mod compose;
mod convert;
mod identifiable;

pub use backend::{Backend, BackendConnection, BackendKind};
pub use collection::{DocumentCollection, FindOptions};
pub use compose::{compose_filter, compose_id_filter, compose_ids_filter, compose_sort, compose_update};
pub use convert::{ENTITY_ID_FIELD, ID_FIELD, from_document, id_to_bson, to_document};
pub use identifiable::{EntityKey, GeneratedId, Identifiable};
