//! Types for the document store client API

use crate::error::DocStoreError;
use std::fmt;
use std::str::FromStr;

/// How requests authenticate against the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No credentials attached
    None,
    /// HTTP Basic on every request
    Basic,
    /// HTTP Digest, answered per request
    Digest,
}

impl FromStr for AuthMode {
    type Err = DocStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(AuthMode::None),
            "basic" => Ok(AuthMode::Basic),
            "digest" => Ok(AuthMode::Digest),
            other => Err(DocStoreError::UnsupportedAuthType(other.to_string())),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthMode::None => "none",
            AuthMode::Basic => "basic",
            AuthMode::Digest => "digest",
        })
    }
}

/// Server-minted transaction identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Operation reported in an [`OperationResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Put,
    Delete,
    Move,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Move => "MOVE",
        })
    }
}

/// Outcome of a successful write, delete or move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub verb: Verb,
    /// HTTP status returned by the service (the put's status for a move)
    pub status: u16,
    /// Absolute document URI, root included
    pub uri: String,
}

impl OperationResult {
    pub(crate) fn new(verb: Verb, status: u16, uri: impl Into<String>) -> Self {
        Self {
            verb,
            status,
            uri: uri.into(),
        }
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.verb, self.status, self.uri)
    }
}

/// Error body format the service should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorFormat {
    #[default]
    Json,
    Xml,
}

impl ErrorFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorFormat::Json => "json",
            ErrorFormat::Xml => "xml",
        }
    }
}
