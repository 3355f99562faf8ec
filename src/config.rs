//! Client configuration

use crate::error::{DocStoreError, Result};
use serde::Deserialize;
use std::path::Path;

const PERMISSION_PREFIX: &str = "perm:";

/// Connection settings for a [`DocumentStoreClient`](crate::DocumentStoreClient)
///
/// `auth` stays a raw string here; it is validated when the client is built.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST service (e.g. `http://localhost:8000`)
    #[serde(default = "default_url")]
    pub url: String,

    /// One of `none`, `basic`, `digest`
    #[serde(default = "default_auth")]
    pub auth: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Target database; the service default is used when unset
    #[serde(default)]
    pub database: Option<String>,

    /// Prefix prepended to every document URI
    #[serde(default)]
    pub root: String,

    /// Grants applied to every document written
    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            auth: default_auth(),
            user: None,
            password: None,
            database: None,
            root: String::new(),
            permissions: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_auth() -> String {
    "digest".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    /// Parse a TOML config document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DocStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

/// A role granted a privilege on written documents
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Permission {
    pub role: String,
    pub privilege: String,
}

impl Permission {
    pub fn new(role: impl Into<String>, privilege: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            privilege: privilege.into(),
        }
    }

    /// Query parameter pair, `perm:{role}={privilege}`
    pub fn query_pair(&self) -> (String, String) {
        let key = if self.role.starts_with(PERMISSION_PREFIX) {
            self.role.clone()
        } else {
            format!("{}{}", PERMISSION_PREFIX, self.role)
        };
        (key, self.privilege.clone())
    }
}
