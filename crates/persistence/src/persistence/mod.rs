//! Persistence components.
//!
//! - [`MongoDbPersistence`] - connection lifecycle and generic queries over
//!   raw filter documents
//! - [`IdentifiableMongoDbPersistence`] - CRUD keyed by a unique identifier

mod base;
mod identifiable;

pub use base::{LifecycleState, MongoDbPersistence};
pub use identifiable::IdentifiableMongoDbPersistence;
