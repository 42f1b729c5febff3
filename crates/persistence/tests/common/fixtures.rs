//! Test entities and persistence factories.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use mongodb_persistence::backends::memory::MemoryBackend;
use mongodb_persistence::config::MongoDbConfig;
use mongodb_persistence::core::Identifiable;
use mongodb_persistence::persistence::IdentifiableMongoDbPersistence;

/// Collection used by the test persistence.
pub const COLLECTION: &str = "dummies";

/// Database used by the test persistence.
pub const DATABASE: &str = "test";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerDummy {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dummy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_dummy: Option<InnerDummy>,
}

impl Identifiable<String> for Dummy {
    fn id(&self) -> Option<&String> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

impl Dummy {
    pub fn new(key: &str, content: &str) -> Self {
        Self {
            id: None,
            key: key.to_string(),
            content: content.to_string(),
            inner_dummy: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_inner(mut self, name: &str, description: &str) -> Self {
        self.inner_dummy = Some(InnerDummy {
            id: format!("inner-{name}"),
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }
}

pub fn dummy1() -> Dummy {
    Dummy::new("Key 1", "Content 1").with_inner("Inner 1", "Inner description 1")
}

pub fn dummy2() -> Dummy {
    Dummy::new("Key 2", "Content 2").with_inner("Inner 2", "Inner description 2")
}

pub type DummyPersistence = IdentifiableMongoDbPersistence<Dummy, String>;

pub fn default_config() -> MongoDbConfig {
    MongoDbConfig::for_host("localhost", 27017, DATABASE)
}

/// Creates a closed persistence over `backend`.
pub fn create_persistence(backend: &MemoryBackend, config: &MongoDbConfig) -> DummyPersistence {
    let mut persistence = DummyPersistence::new(COLLECTION, Arc::new(backend.clone()));
    persistence.configure(config);
    persistence
}

/// Creates an open persistence over a fresh backend.
pub async fn open_persistence() -> (MemoryBackend, DummyPersistence) {
    open_persistence_with(default_config()).await
}

/// Creates an open persistence over a fresh backend with `config`.
pub async fn open_persistence_with(config: MongoDbConfig) -> (MemoryBackend, DummyPersistence) {
    let backend = MemoryBackend::new();
    let persistence = create_persistence(&backend, &config);
    persistence
        .open()
        .await
        .expect("Failed to open persistence");
    (backend, persistence)
}

/// Creates `count` dummies with keys `Key 1..=count`.
pub async fn seed(persistence: &DummyPersistence, count: usize) -> Vec<Dummy> {
    let mut created = Vec::with_capacity(count);
    for i in 1..=count {
        let dummy = Dummy::new(&format!("Key {i}"), &format!("Content {i}"))
            .with_inner(&format!("Inner {i}"), &format!("Inner description {i}"));
        created.push(persistence.create(dummy).await.expect("Create should succeed"));
    }
    created
}

/// Sorted keys of `items`, for order-insensitive comparisons.
pub fn keys(items: &[Dummy]) -> Vec<String> {
    let mut keys: Vec<String> = items.iter().map(|d| d.key.clone()).collect();
    keys.sort();
    keys
}
