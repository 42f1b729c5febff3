//! Discovery services and credential stores.
//!
//! Connection and credential descriptors may name a key instead of carrying
//! literal values. These traits resolve such keys; the in-memory
//! implementations are useful for tests and static deployments.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StorageResult;

use super::{ConnectionParams, CredentialParams};

/// Resolves discovery keys to connection descriptors.
#[async_trait]
pub trait Discovery: Send + Sync + Debug {
    /// Returns every connection registered under `key` (possibly none).
    async fn resolve_all(&self, key: &str) -> StorageResult<Vec<ConnectionParams>>;
}

/// Resolves store keys to credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync + Debug {
    /// Returns the credential stored under `key`, if any.
    async fn lookup(&self, key: &str) -> StorageResult<Option<CredentialParams>>;
}

/// Discovery service backed by an in-process map.
#[derive(Debug, Default)]
pub struct MemoryDiscovery {
    entries: RwLock<HashMap<String, Vec<ConnectionParams>>>,
}

impl MemoryDiscovery {
    /// Creates an empty discovery service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection under `key`, after any already registered.
    pub fn register(&self, key: impl Into<String>, connection: ConnectionParams) {
        self.entries
            .write()
            .entry(key.into())
            .or_default()
            .push(connection);
    }
}

#[async_trait]
impl Discovery for MemoryDiscovery {
    async fn resolve_all(&self, key: &str) -> StorageResult<Vec<ConnectionParams>> {
        Ok(self.entries.read().get(key).cloned().unwrap_or_default())
    }
}

/// Credential store backed by an in-process map.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, CredentialParams>>,
}

impl MemoryCredentialStore {
    /// Creates an empty credential store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a credential under `key`, replacing any previous one.
    pub fn store(&self, key: impl Into<String>, credential: CredentialParams) {
        self.entries.write().insert(key.into(), credential);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn lookup(&self, key: &str) -> StorageResult<Option<CredentialParams>> {
        Ok(self.entries.read().get(key).cloned())
    }
}
