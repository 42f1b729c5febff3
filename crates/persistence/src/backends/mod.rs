//! Database backend implementations.
//!
//! # Available Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Memory | (always) | Process-local store for tests and development |
//! | MongoDB | `mongodb` | The official MongoDB driver |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "mongodb")]
//! use mongodb_persistence::backends::mongodb::MongoBackend;
//! use mongodb_persistence::backends::memory::MemoryBackend;
//!
//! // Shared in-process store
//! let memory = MemoryBackend::new();
//!
//! // Real server
//! # #[cfg(feature = "mongodb")]
//! let mongo = MongoBackend::new();
//! ```

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongodb;

/// Database used when a connection string names none.
pub(crate) const DEFAULT_DATABASE: &str = "test";
