//! MongoDB backend implementation.

use std::sync::Arc;
use std::time::Duration;

use ::mongodb::bson::doc;
use ::mongodb::options::ClientOptions;
use ::mongodb::{Client, Database};
use async_trait::async_trait;

use crate::backends::DEFAULT_DATABASE;
use crate::config::PersistenceOptions;
use crate::core::{Backend, BackendConnection, BackendKind, DocumentCollection};
use crate::error::{ConnectionError, StorageResult};

use super::MongoCollection;

const BACKEND_NAME: &str = "mongodb";

/// Backend connecting to a MongoDB server.
#[derive(Debug, Clone, Default)]
pub struct MongoBackend {
    app_name: Option<String>,
}

impl MongoBackend {
    /// Creates a backend with driver defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application name reported to the server.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    fn connection_error(message: impl Into<String>, source: ::mongodb::error::Error) -> ConnectionError {
        ConnectionError::Failed {
            backend_name: BACKEND_NAME.to_string(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[async_trait]
impl Backend for MongoBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MongoDB
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn connect(
        &self,
        uri: &str,
        collection: &str,
        options: &PersistenceOptions,
    ) -> StorageResult<Box<dyn BackendConnection>> {
        let mut client_options = ClientOptions::parse(uri)
            .await
            .map_err(|e| Self::connection_error(format!("invalid connection string: {e}"), e))?;

        if let Some(max_pool_size) = options.max_pool_size {
            client_options.max_pool_size = Some(max_pool_size);
        }
        if let Some(timeout_ms) = options.connect_timeout_ms {
            let timeout = Duration::from_millis(timeout_ms);
            client_options.connect_timeout = Some(timeout);
            client_options.server_selection_timeout = Some(timeout);
        }
        if self.app_name.is_some() {
            client_options.app_name = self.app_name.clone();
        }

        let client = Client::with_options(client_options)
            .map_err(|e| Self::connection_error(e.to_string(), e))?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));

        if let Err(e) = database.run_command(doc! { "ping": 1 }).await {
            client.shutdown().await;
            return Err(Self::connection_error(e.to_string(), e).into());
        }

        tracing::debug!(
            database = database.name(),
            collection,
            "Connected to MongoDB"
        );

        let collection = Arc::new(MongoCollection::new(
            database.collection(collection),
        ));
        Ok(Box::new(MongoConnection {
            client,
            database,
            collection,
        }))
    }
}

#[derive(Debug)]
struct MongoConnection {
    client: Client,
    database: Database,
    collection: Arc<MongoCollection>,
}

#[async_trait]
impl BackendConnection for MongoConnection {
    fn database_name(&self) -> &str {
        self.database.name()
    }

    fn collection(&self) -> Arc<dyn DocumentCollection> {
        self.collection.clone()
    }

    async fn close(&self) -> StorageResult<()> {
        self.client.clone().shutdown().await;
        tracing::debug!(database = self.database.name(), "Disconnected from MongoDB");
        Ok(())
    }
}
