//! HTTP client for the modules-database REST API

use crate::auth::{new_cnonce, Credentials, DigestChallenge};
use crate::config::{ClientConfig, Permission};
use crate::error::{DocStoreError, Result};
use crate::types::*;
use reqwest::{header, redirect, Client, Method, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// HTTP client for a modules database
///
/// Every caller-supplied URI is prefixed with the configured root. Writes
/// carry the configured permission grants; moves are wrapped in a server
/// transaction.
///
/// # Example
///
/// ```rust,no_run
/// use docstore_client::{ClientConfig, DocumentStoreClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DocumentStoreClient::new(ClientConfig {
///     url: "http://localhost:8000".into(),
///     auth: "digest".into(),
///     user: Some("admin".into()),
///     password: Some("admin".into()),
///     root: "/app".into(),
///     ..Default::default()
/// })?;
///
/// client.put("/lib/util.xqy", "xquery version '1.0-ml';", None).await?;
/// let moved = client.move_file("/lib/util.xqy", "/lib/text.xqy", "src/text.xqy", None).await?;
/// println!("{}", moved);
/// # Ok(())
/// # }
/// ```
pub struct DocumentStoreClient {
    config: ClientConfig,
    base_url: Url,
    credentials: Credentials,
    client: Client,
}

impl DocumentStoreClient {
    /// Create a new client. No request is sent.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let credentials = Credentials::from_config(&config)?;

        let base_url = Url::parse(config.url.trim_end_matches('/'))
            .map_err(|e| DocStoreError::InvalidConfig(format!("url '{}': {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DocStoreError::InvalidConfig(format!(
                "url '{}' cannot be a base URL",
                config.url
            )));
        }

        // Transaction create answers 303; the Location is read, not followed.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::none())
            .build()?;

        debug!(url = %base_url, auth = %credentials.mode(), "document store client ready");

        Ok(Self {
            config,
            base_url,
            credentials,
            client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.credentials.mode()
    }

    /// Absolute document URI for a caller URI
    pub fn absolute_uri(&self, uri: &str) -> String {
        format!("{}{}", self.config.root, uri)
    }

    // ==================== Documents ====================

    /// Write `body` at `root + uri`
    pub async fn put(
        &self,
        uri: &str,
        body: impl Into<Vec<u8>>,
        transaction: Option<&TransactionId>,
    ) -> Result<OperationResult> {
        let params = self.document_params(uri, true, transaction);
        let absolute = params[0].1.clone();
        let url = self.endpoint(&["v1", "documents"], &params)?;

        let body = body.into();
        let response = self.send(Method::PUT, url, Some(body.as_slice()), None).await?;
        let response = expect_success(response).await?;

        Ok(OperationResult::new(
            Verb::Put,
            response.status().as_u16(),
            absolute,
        ))
    }

    /// Read a local file as text and write it at `root + uri`
    pub async fn put_file(
        &self,
        uri: &str,
        file_path: impl AsRef<Path>,
        transaction: Option<&TransactionId>,
    ) -> Result<OperationResult> {
        let body = read_text(file_path.as_ref()).await?;
        self.put(uri, body, transaction).await
    }

    /// Delete the document at `root + uri`
    pub async fn delete(
        &self,
        uri: &str,
        transaction: Option<&TransactionId>,
    ) -> Result<OperationResult> {
        let params = self.document_params(uri, false, transaction);
        let absolute = params[0].1.clone();
        let url = self.endpoint(&["v1", "documents"], &params)?;

        let response = self.send(Method::DELETE, url, None, None).await?;
        let response = expect_success(response).await?;

        Ok(OperationResult::new(
            Verb::Delete,
            response.status().as_u16(),
            absolute,
        ))
    }

    /// Replace `from_uri` with `body` at `to_uri` inside one transaction.
    ///
    /// Without a caller transaction the client creates one, commits it on
    /// success and rolls it back if the delete or put fails. A caller
    /// transaction is left open; the move is not durable until the caller
    /// commits it.
    pub async fn move_document(
        &self,
        from_uri: &str,
        to_uri: &str,
        body: impl Into<Vec<u8>>,
        transaction: Option<&TransactionId>,
    ) -> Result<OperationResult> {
        let body = body.into();
        let (tx, owned) = match transaction {
            Some(tx) => (tx.clone(), false),
            None => (self.create_transaction().await?, true),
        };

        let put = match self.delete_then_put(from_uri, to_uri, body, &tx).await {
            Ok(put) => put,
            Err(e) => {
                if owned {
                    self.abandon(&tx).await;
                }
                return Err(e);
            }
        };

        if owned {
            self.commit_transaction(&tx).await?;
        } else {
            debug!(txid = %tx, "move left for caller to commit");
        }

        info!(from = from_uri, to = %put.uri, txid = %tx, "moved document");
        Ok(OperationResult::new(Verb::Move, put.status, put.uri))
    }

    /// [`move_document`](Self::move_document) with the body read from a local file.
    ///
    /// The file is read before any request is made.
    pub async fn move_file(
        &self,
        from_uri: &str,
        to_uri: &str,
        file_path: impl AsRef<Path>,
        transaction: Option<&TransactionId>,
    ) -> Result<OperationResult> {
        let body = read_text(file_path.as_ref()).await?;
        self.move_document(from_uri, to_uri, body, transaction).await
    }

    async fn delete_then_put(
        &self,
        from_uri: &str,
        to_uri: &str,
        body: Vec<u8>,
        tx: &TransactionId,
    ) -> Result<OperationResult> {
        self.delete(from_uri, Some(tx)).await?;
        self.put(to_uri, body, Some(tx)).await
    }

    async fn abandon(&self, tx: &TransactionId) {
        if let Err(e) = self.rollback_transaction(tx).await {
            warn!(txid = %tx, error = %e, "rollback failed; transaction left to expire");
        }
    }

    // ==================== Transactions ====================

    /// Open a server transaction
    pub async fn create_transaction(&self) -> Result<TransactionId> {
        let params = self.database_params();
        let url = self.endpoint(&["v1", "transactions"], &params)?;

        let response = self.send(Method::POST, url, None, None).await?;
        if response.status() != StatusCode::SEE_OTHER {
            return Err(remote_error(response).await);
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .ok_or_else(|| {
                DocStoreError::MalformedLocation("response has no Location header".to_string())
            })?
            .to_str()
            .map_err(|_| {
                DocStoreError::MalformedLocation("Location header is not valid UTF-8".to_string())
            })?;

        let tx = parse_transaction_location(&self.base_url, location)?;
        info!(txid = %tx, "created transaction");
        Ok(tx)
    }

    /// Commit a server transaction
    pub async fn commit_transaction(&self, tx: &TransactionId) -> Result<()> {
        self.finish_transaction(tx, "commit").await?;
        info!(txid = %tx, "committed transaction");
        Ok(())
    }

    /// Roll back a server transaction
    pub async fn rollback_transaction(&self, tx: &TransactionId) -> Result<()> {
        self.finish_transaction(tx, "rollback").await?;
        info!(txid = %tx, "rolled back transaction");
        Ok(())
    }

    async fn finish_transaction(&self, tx: &TransactionId, result: &str) -> Result<()> {
        let mut params = vec![("result".to_string(), result.to_string())];
        params.extend(self.database_params());
        let url = self.endpoint(&["v1", "transactions", tx.as_str()], &params)?;

        let response = self.send(Method::POST, url, None, None).await?;
        expect_success(response).await?;
        Ok(())
    }

    // ==================== Server config ====================

    /// Set the error body format the service uses for this REST instance
    pub async fn configure_error_format(&self, format: ErrorFormat) -> Result<()> {
        let params = vec![("format".to_string(), format.as_str().to_string())];
        let url = self.endpoint(&["v1", "config", "properties", "error-format"], &params)?;
        let body = serde_json::json!({ "error-format": format.as_str() })
            .to_string()
            .into_bytes();

        let response = self
            .send(Method::PUT, url, Some(body.as_slice()), Some("application/json"))
            .await?;
        expect_success(response).await?;
        info!(format = format.as_str(), "configured error format");
        Ok(())
    }

    // ==================== Helper Methods ====================

    fn document_params(
        &self,
        uri: &str,
        with_permissions: bool,
        transaction: Option<&TransactionId>,
    ) -> Vec<(String, String)> {
        let mut params = vec![("uri".to_string(), self.absolute_uri(uri))];
        if with_permissions {
            params.extend(self.config.permissions.iter().map(Permission::query_pair));
        }
        if let Some(tx) = transaction {
            params.push(("txid".to_string(), tx.to_string()));
        }
        params.extend(self.database_params());
        params
    }

    fn database_params(&self) -> Vec<(String, String)> {
        self.config
            .database
            .iter()
            .map(|db| ("database".to_string(), db.clone()))
            .collect()
    }

    fn endpoint(&self, segments: &[&str], params: &[(String, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DocStoreError::InvalidConfig(format!("url '{}' has no path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&[u8]>,
        content_type: Option<&str>,
    ) -> Result<Response> {
        let build = |authorization: Option<&str>| {
            let mut request = self.client.request(method.clone(), url.clone());
            if let Credentials::Basic { user, password } = &self.credentials {
                request = request.basic_auth(user, Some(password));
            }
            if let Some(value) = authorization {
                request = request.header(header::AUTHORIZATION, value);
            }
            if let Some(value) = content_type {
                request = request.header(header::CONTENT_TYPE, value);
            }
            if let Some(body) = body {
                request = request.body(body.to_vec());
            }
            request
        };

        let response = build(None).send().await?;
        debug!(%method, %url, status = response.status().as_u16(), "request");

        let Credentials::Digest { user, password } = &self.credentials else {
            return Ok(response);
        };
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let parsed = DigestChallenge::from_headers(
            response
                .headers()
                .get_all(header::WWW_AUTHENTICATE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let challenge = match parsed {
            Ok(challenge) => challenge,
            Err(e) => {
                debug!(%method, %url, error = %e, "401 has no answerable digest challenge");
                return Ok(response);
            }
        };
        let authorization = challenge.respond(
            user,
            password,
            method.as_str(),
            &request_target(&url),
            &new_cnonce(),
            1,
        );

        let response = build(Some(&authorization)).send().await?;
        debug!(%method, %url, status = response.status().as_u16(), "digest request");
        Ok(response)
    }
}

/// Extract the transaction id from a transaction-create `Location`.
///
/// Relative locations resolve against `base`; the id is the path segment
/// after `transactions`.
pub fn parse_transaction_location(base: &Url, location: &str) -> Result<TransactionId> {
    let resolved = base
        .join(location)
        .map_err(|e| DocStoreError::MalformedLocation(format!("{}: {}", location, e)))?;

    let mut segments = resolved
        .path_segments()
        .ok_or_else(|| DocStoreError::MalformedLocation(location.to_string()))?;

    if segments.by_ref().any(|s| s == "transactions") {
        if let Some(id) = segments.next().filter(|id| !id.is_empty()) {
            let id = urlencoding::decode(id).map_err(|e| {
                DocStoreError::MalformedLocation(format!("{}: {}", location, e))
            })?;
            return Ok(TransactionId::new(id.into_owned()));
        }
    }

    Err(DocStoreError::MalformedLocation(format!(
        "no transaction id in {}",
        location
    )))
}

fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DocStoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn expect_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(remote_error(response).await)
    }
}

async fn remote_error(response: Response) -> DocStoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    DocStoreError::RemoteService { status, body }
}
