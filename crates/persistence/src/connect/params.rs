//! Connection and credential descriptors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigParams;
use crate::error::ConfigError;

/// Describes one database node, or carries a full connection URI.
///
/// Any keys besides the named fields are kept in `options` and end up as
/// query parameters of the resolved URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Complete connection string; bypasses every other field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Host name or IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Key used to look the connection up in a discovery service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_key: Option<String>,

    /// Extra driver options.
    #[serde(flatten)]
    pub options: BTreeMap<String, String>,
}

impl ConnectionParams {
    /// Creates a host/port/database descriptor.
    pub fn from_host(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            database: Some(database.into()),
            ..Default::default()
        }
    }

    /// Creates a descriptor carrying an explicit URI.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Default::default()
        }
    }

    /// Creates a descriptor that is resolved through a discovery service.
    pub fn from_discovery_key(key: impl Into<String>) -> Self {
        Self {
            discovery_key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Adds an extra driver option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Reads a descriptor from a `connection` config section.
    pub fn from_config(section: &ConfigParams) -> Result<Self, ConfigError> {
        let mut params = Self {
            uri: section.get("uri").map(str::to_string),
            host: section.get("host").map(str::to_string),
            port: section.get_as::<u16>("port")?,
            database: section.get("database").map(str::to_string),
            discovery_key: section.get("discovery_key").map(str::to_string),
            options: BTreeMap::new(),
        };
        for (key, value) in section.iter() {
            if !matches!(
                key,
                "uri" | "host" | "port" | "database" | "discovery_key"
            ) {
                params.options.insert(key.to_string(), value.to_string());
            }
        }
        Ok(params)
    }

    /// Returns true if this descriptor must be resolved through discovery.
    pub fn uses_discovery(&self) -> bool {
        self.discovery_key.is_some() && self.uri.is_none() && self.host.is_none()
    }
}

/// Describes the credentials used to authenticate.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialParams {
    /// User name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// User password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Key used to look the credential up in a credential store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_key: Option<String>,

    /// Extra driver options (e.g. `authSource`).
    #[serde(flatten)]
    pub options: BTreeMap<String, String>,
}

impl std::fmt::Debug for CredentialParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialParams")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("store_key", &self.store_key)
            .field("options", &self.options)
            .finish()
    }
}

impl CredentialParams {
    /// Creates a username/password credential.
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: Some(username.into()),
            password,
            ..Default::default()
        }
    }

    /// Creates a credential that is looked up in a credential store.
    pub fn from_store_key(key: impl Into<String>) -> Self {
        Self {
            store_key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Adds an extra driver option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Reads a credential from a `credential` config section.
    pub fn from_config(section: &ConfigParams) -> Self {
        let mut params = Self {
            username: section.get("username").map(str::to_string),
            password: section.get("password").map(str::to_string),
            store_key: section.get("store_key").map(str::to_string),
            options: BTreeMap::new(),
        };
        for (key, value) in section.iter() {
            if !matches!(key, "username" | "password" | "store_key") {
                params.options.insert(key.to_string(), value.to_string());
            }
        }
        params
    }

    /// Returns true if this credential must be resolved through a store.
    pub fn uses_store(&self) -> bool {
        self.store_key.is_some() && self.username.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_from_config() {
        let section = ConfigParams::from_tuples([
            ("host", "localhost"),
            ("port", "27017"),
            ("database", "test"),
            ("replicaSet", "rs0"),
        ]);
        let params = ConnectionParams::from_config(&section).unwrap();
        assert_eq!(params.host.as_deref(), Some("localhost"));
        assert_eq!(params.port, Some(27017));
        assert_eq!(params.database.as_deref(), Some("test"));
        assert_eq!(params.options.len(), 1);
        assert_eq!(params.options["replicaSet"], "rs0");
    }

    #[test]
    fn test_connection_from_config_bad_port() {
        let section = ConfigParams::from_tuples([("host", "localhost"), ("port", "99999")]);
        let err = ConnectionParams::from_config(&section).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "port"));
    }

    #[test]
    fn test_uses_discovery() {
        assert!(ConnectionParams::from_discovery_key("main").uses_discovery());
        let literal = ConnectionParams {
            discovery_key: Some("main".to_string()),
            ..ConnectionParams::from_host("h", 1, "d")
        };
        assert!(!literal.uses_discovery());
    }

    #[test]
    fn test_credential_debug_hides_password() {
        let credential = CredentialParams::new("admin", Some("secret".to_string()));
        let debug = format!("{:?}", credential);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_credential_from_config() {
        let section = ConfigParams::from_tuples([
            ("username", "admin"),
            ("authSource", "admin"),
        ]);
        let credential = CredentialParams::from_config(&section);
        assert_eq!(credential.username.as_deref(), Some("admin"));
        assert!(credential.password.is_none());
        assert_eq!(credential.options["authSource"], "admin");
    }
}
