//! Connection resolution.
//!
//! Turns structured configuration into a driver-ready connection URI:
//!
//! - [`ConnectionParams`], [`CredentialParams`] - connection and credential descriptors
//! - [`Discovery`], [`CredentialStore`] - optional key lookup services
//! - [`resolve_uri`] - validation and URI composition
//! - [`MongoDbConnectionResolver`] - key lookups followed by [`resolve_uri`]

mod discovery;
mod params;
mod resolver;

pub use discovery::{CredentialStore, Discovery, MemoryCredentialStore, MemoryDiscovery};
pub use params::{ConnectionParams, CredentialParams};
pub use resolver::{MONGODB_SCHEME, MongoDbConnectionResolver, resolve_uri};
