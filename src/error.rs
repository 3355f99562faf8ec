//! Error types for the document store client

use std::path::PathBuf;
use thiserror::Error;

/// Document store client error
#[derive(Debug, Error)]
pub enum DocStoreError {
    /// `auth` was not one of `none`, `basic` or `digest`
    #[error("Unsupported auth type: {0}")]
    UnsupportedAuthType(String),

    /// Configuration is otherwise unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Server answered with a status the operation does not accept
    #[error("Server error {status}: {body}")]
    RemoteService { status: u16, body: String },

    /// Transaction create did not return a usable `Location`
    #[error("Malformed transaction location: {0}")]
    MalformedLocation(String),

    /// Digest challenge could not be answered
    #[error("Digest challenge error: {0}")]
    DigestChallenge(String),

    /// Local file could not be read
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Config file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl DocStoreError {
    /// True for failures raised while building a client from its config
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DocStoreError::UnsupportedAuthType(_)
                | DocStoreError::InvalidConfig(_)
                | DocStoreError::ConfigParse(_)
        )
    }

    /// HTTP status of a remote failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            DocStoreError::RemoteService { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for document store operations
pub type Result<T> = std::result::Result<T, DocStoreError>;
