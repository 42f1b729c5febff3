//! Error types for the persistence layer.
//!
//! This module defines all error types used throughout the persistence layer,
//! following a hierarchy that separates configuration errors, connection
//! errors, lifecycle state errors and backend errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage operations.
///
/// This enum encompasses all possible errors that can occur during persistence
/// operations, organized by category.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Missing or unresolvable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failure to establish a connection
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Operation invoked in the wrong lifecycle state
    #[error(transparent)]
    State(#[from] StateError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns the configuration error code, if this is a configuration error.
    pub fn config_code(&self) -> Option<&'static str> {
        match self {
            StorageError::Config(err) => Some(err.code()),
            _ => None,
        }
    }
}

/// Errors raised while validating or resolving connection configuration.
///
/// These are never retried; they surface to whoever configured the component.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No connection descriptors were configured or discovered.
    #[error("database connection is not set")]
    NoConnection,

    /// A connection without an explicit URI has no host.
    #[error("connection host is not set")]
    NoHost,

    /// A connection without an explicit URI has no (or a zero) port.
    #[error("connection port is not set")]
    NoPort,

    /// A connection without an explicit URI has no database.
    #[error("connection database is not set")]
    NoDatabase,

    /// A discovery or store key was given but nothing can resolve it.
    #[error("cannot resolve {kind} key '{key}': {message}")]
    CannotResolve {
        kind: String,
        key: String,
        message: String,
    },

    /// A configuration value could not be parsed.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    /// Returns the stable error code for this configuration error.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::NoConnection => "NO_CONNECTION",
            ConfigError::NoHost => "NO_HOST",
            ConfigError::NoPort => "NO_PORT",
            ConfigError::NoDatabase => "NO_DATABASE",
            ConfigError::CannotResolve { .. } => "CANNOT_RESOLVE",
            ConfigError::InvalidValue { .. } => "INVALID_VALUE",
        }
    }
}

/// Errors raised when the driver fails to establish a connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Connecting to the backend failed.
    #[error("connection to {backend_name} failed: {message}")]
    Failed {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Errors related to the open/close lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The component is not open.
    #[error("operation cannot be performed because the component is closed")]
    NotOpened,
}

/// Errors originating from the database backend.
///
/// Driver failures are carried unchanged as the error source.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Error reported by the database driver.
    #[error("{backend_name} driver error: {message}")]
    Driver {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A document with the same primary key already exists.
    #[error("duplicate key in collection {collection}: {id}")]
    DuplicateKey { collection: String, id: String },

    /// The backend does not understand a query or update operator.
    #[error("unsupported operator '{operator}'")]
    UnsupportedOperator { operator: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
    },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<bson::ser::Error> for StorageError {
    fn from(err: bson::ser::Error) -> Self {
        StorageError::Backend(BackendError::Serialization {
            message: err.to_string(),
        })
    }
}

impl From<bson::de::Error> for StorageError {
    fn from(err: bson::de::Error) -> Self {
        StorageError::Backend(BackendError::Serialization {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::Backend(BackendError::Driver {
            backend_name: "mongodb".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}
