//! Configuration for MongoDB persistence components.
//!
//! Configuration can be supplied three ways:
//!
//! - as a [`MongoDbConfig`] value, which is serde-deserializable and so can be
//!   embedded in any application config file;
//! - as flat dotted key/value pairs ([`ConfigParams`]), e.g.
//!   `connection.host`, `credential.username`, `options.max_page_size`;
//! - from environment variables via [`MongoDbConfig::from_env`].
//!
//! # Example
//!
//! ```
//! use mongodb_persistence::config::{ConfigParams, MongoDbConfig};
//!
//! let params = ConfigParams::from_tuples([
//!     ("collection", "dummies"),
//!     ("connection.host", "localhost"),
//!     ("connection.port", "27017"),
//!     ("connection.database", "test"),
//!     ("options.max_page_size", "50"),
//! ]);
//!
//! let config = MongoDbConfig::from_params(&params).unwrap();
//! assert_eq!(config.collection.as_deref(), Some("dummies"));
//! assert_eq!(config.connections.len(), 1);
//! assert_eq!(config.options.max_page_size, 50);
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::connect::{ConnectionParams, CredentialParams};
use crate::error::ConfigError;
use crate::types::DEFAULT_MAX_PAGE_SIZE;

/// Flat configuration parameters with dotted keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigParams(BTreeMap<String, String>);

impl ConfigParams {
    /// Creates empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from key/value pairs. Later duplicates win.
    pub fn from_tuples<K, V>(tuples: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            tuples
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Sets a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns a parameter parsed as `T`.
    pub fn get_as<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    /// Returns a parameter parsed as a boolean.
    ///
    /// Accepts `true/false`, `1/0`, `yes/no` and `on/off`.
    pub fn get_as_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get(key)
            .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                other => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{other}' is not a boolean"),
                }),
            })
            .transpose()
    }

    /// Returns the parameters under `name.`, with that prefix removed.
    pub fn section(&self, name: &str) -> ConfigParams {
        let prefix = format!("{name}.");
        Self(
            self.0
                .iter()
                .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|k| (k.to_string(), v.clone())))
                .collect(),
        )
    }

    /// Returns the names of the direct subsections (the first key segment).
    pub fn section_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .0
            .keys()
            .filter_map(|k| k.split_once('.').map(|(head, _)| head.to_string()))
            .collect();
        names.dedup();
        names
    }

    /// Iterates over all parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true when there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads either a numbered `plural.N.*` list or a single `singular.*`
    /// section.
    fn many_sections(&self, singular: &str, plural: &str) -> Vec<ConfigParams> {
        let many = self.section(plural);
        if !many.is_empty() {
            let mut names = many.section_names();
            names.sort_by_key(|name| name.parse::<u64>().unwrap_or(u64::MAX));
            return names.iter().map(|name| many.section(name)).collect();
        }

        let single = self.section(singular);
        if single.is_empty() {
            Vec::new()
        } else {
            vec![single]
        }
    }
}

/// Tuning options for a persistence component (`options.*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceOptions {
    /// Maximum page size; caps `take` in paged queries. Must be positive;
    /// zero falls back to [`DEFAULT_MAX_PAGE_SIZE`].
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Maximum connection pool size (driver default when unset).
    #[serde(default)]
    pub max_pool_size: Option<u32>,

    /// Connection timeout in milliseconds (driver default when unset).
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    /// Log composed queries at debug level.
    #[serde(default)]
    pub debug: bool,
}

fn default_max_page_size() -> u64 {
    DEFAULT_MAX_PAGE_SIZE
}

fn positive_page_size(key: &str, max_page_size: u64) -> Result<u64, ConfigError> {
    if max_page_size == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "page size must be positive".to_string(),
        });
    }
    Ok(max_page_size)
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            max_pool_size: None,
            connect_timeout_ms: None,
            debug: false,
        }
    }
}

impl PersistenceOptions {
    /// Returns the effective page size limit, never zero.
    pub fn page_limit(&self) -> u64 {
        if self.max_page_size == 0 {
            DEFAULT_MAX_PAGE_SIZE
        } else {
            self.max_page_size
        }
    }

    /// Reads options from an `options` section, keeping `self` for absent keys.
    pub fn override_from(mut self, section: &ConfigParams) -> Result<Self, ConfigError> {
        if let Some(max_page_size) = section.get_as::<u64>("max_page_size")? {
            self.max_page_size = positive_page_size("max_page_size", max_page_size)?;
        }
        if let Some(max_pool_size) = section.get_as::<u32>("max_pool_size")? {
            self.max_pool_size = Some(max_pool_size);
        }
        if let Some(connect_timeout) = section.get_as::<u64>("connect_timeout")? {
            self.connect_timeout_ms = Some(connect_timeout);
        }
        if let Some(debug) = section.get_as_bool("debug")? {
            self.debug = debug;
        }
        Ok(self)
    }
}

/// Complete configuration of a MongoDB persistence component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoDbConfig {
    /// Collection name override.
    #[serde(default)]
    pub collection: Option<String>,

    /// Connection descriptors; several describe the nodes of one cluster.
    #[serde(default)]
    pub connections: Vec<ConnectionParams>,

    /// Credential descriptors; the first one that resolves is used.
    #[serde(default)]
    pub credentials: Vec<CredentialParams>,

    /// Tuning options.
    #[serde(default)]
    pub options: PersistenceOptions,
}

impl MongoDbConfig {
    /// Creates a configuration with a single host/port/database connection.
    pub fn for_host(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            connections: vec![ConnectionParams::from_host(host, port, database)],
            ..Default::default()
        }
    }

    /// Creates a configuration with an explicit connection URI.
    pub fn for_uri(uri: impl Into<String>) -> Self {
        Self {
            connections: vec![ConnectionParams::from_uri(uri)],
            ..Default::default()
        }
    }

    /// Sets the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Adds a credential.
    pub fn with_credential(mut self, credential: CredentialParams) -> Self {
        self.credentials.push(credential);
        self
    }

    /// Sets the maximum page size; zero restores the default.
    pub fn with_max_page_size(mut self, max_page_size: u64) -> Self {
        self.options.max_page_size = if max_page_size == 0 {
            DEFAULT_MAX_PAGE_SIZE
        } else {
            max_page_size
        };
        self
    }

    /// Reads configuration from flat dotted parameters.
    ///
    /// Recognized keys: `collection`, `connection.*` or `connections.N.*`,
    /// `credential.*` or `credentials.N.*`, and `options.*`.
    pub fn from_params(params: &ConfigParams) -> Result<Self, ConfigError> {
        let connections = params
            .many_sections("connection", "connections")
            .iter()
            .map(ConnectionParams::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        let credentials = params
            .many_sections("credential", "credentials")
            .iter()
            .map(CredentialParams::from_config)
            .collect();

        let options = PersistenceOptions::default().override_from(&params.section("options"))?;

        Ok(Self {
            collection: params.get("collection").map(str::to_string),
            connections,
            credentials,
            options,
        })
    }

    /// Creates a configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `MONGO_URI` (takes precedence over host/port/database)
    /// - `MONGO_HOST` (default: "localhost")
    /// - `MONGO_PORT` (default: 27017)
    /// - `MONGO_DB` (default: "test")
    /// - `MONGO_USER`, `MONGO_PASSWORD`
    /// - `MONGO_COLLECTION`
    /// - `MONGO_MAX_PAGE_SIZE` (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let connection = match lookup("MONGO_URI").filter(|uri| !uri.is_empty()) {
            Some(uri) => ConnectionParams::from_uri(uri),
            None => {
                let port = match lookup("MONGO_PORT") {
                    Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
                        ConfigError::InvalidValue {
                            key: "MONGO_PORT".to_string(),
                            message: e.to_string(),
                        }
                    })?,
                    None => default_port(),
                };
                ConnectionParams::from_host(
                    lookup("MONGO_HOST").unwrap_or_else(default_host),
                    port,
                    lookup("MONGO_DB").unwrap_or_else(default_database),
                )
            }
        };

        let credentials = match lookup("MONGO_USER") {
            Some(username) => vec![CredentialParams::new(username, lookup("MONGO_PASSWORD"))],
            None => Vec::new(),
        };

        let mut options = PersistenceOptions::default();
        if let Some(raw) = lookup("MONGO_MAX_PAGE_SIZE") {
            let max_page_size = raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: "MONGO_MAX_PAGE_SIZE".to_string(),
                    message: e.to_string(),
                }
            })?;
            options.max_page_size = positive_page_size("MONGO_MAX_PAGE_SIZE", max_page_size)?;
        }

        Ok(Self {
            collection: lookup("MONGO_COLLECTION"),
            connections: vec![connection],
            credentials,
            options,
        })
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    27017
}

fn default_database() -> String {
    "test".to_string()
}
