//! Rust client for a modules-database document service
//!
//! Documents live at URIs under a configured root. Writes and deletes map
//! directly onto the service's `/v1/documents` endpoint; moves are a delete
//! plus a put grouped in a server transaction so they land atomically.
//!
//! # Example
//!
//! ```rust,no_run
//! use docstore_client::{ClientConfig, DocumentStoreClient, Permission};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DocumentStoreClient::new(ClientConfig {
//!     url: "http://localhost:8000".into(),
//!     auth: "basic".into(),
//!     user: Some("deployer".into()),
//!     password: Some("secret".into()),
//!     database: Some("App-Modules".into()),
//!     root: "/app".into(),
//!     permissions: vec![Permission::new("app-user", "execute")],
//!     ..Default::default()
//! })?;
//!
//! // Group several writes in one transaction
//! let tx = client.create_transaction().await?;
//! client.put("/lib/a.xqy", "module a", Some(&tx)).await?;
//! client.move_document("/lib/old.xqy", "/lib/b.xqy", "module b", Some(&tx)).await?;
//! client.commit_transaction(&tx).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

// Re-export main types
pub use client::{parse_transaction_location, DocumentStoreClient};
pub use config::{ClientConfig, Permission};
pub use error::{DocStoreError, Result};
pub use types::*;
