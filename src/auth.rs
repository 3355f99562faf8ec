//! Request authentication
//!
//! Basic credentials ride on every request. Digest is challenge/response:
//! the first attempt goes out bare, and a `401` carrying a
//! `WWW-Authenticate: Digest ...` challenge is answered once with an
//! `Authorization: Digest ...` header computed per RFC 7616 (RFC 2617
//! compatible when the server offers no `qop`).

use crate::config::ClientConfig;
use crate::error::{DocStoreError, Result};
use crate::types::AuthMode;
use md5::Md5;
use sha2::{Digest, Sha256};

/// Credentials selected from the client config
#[derive(Clone)]
pub(crate) enum Credentials {
    None,
    Basic { user: String, password: String },
    Digest { user: String, password: String },
}

impl Credentials {
    pub(crate) fn from_config(config: &ClientConfig) -> Result<Self> {
        let mode: AuthMode = config.auth.parse()?;
        if mode == AuthMode::None {
            return Ok(Credentials::None);
        }

        let user = config.user.clone().ok_or_else(|| {
            DocStoreError::InvalidConfig(format!("auth '{}' requires a user", mode))
        })?;
        let password = config.password.clone().unwrap_or_default();

        Ok(match mode {
            AuthMode::Basic => Credentials::Basic { user, password },
            _ => Credentials::Digest { user, password },
        })
    }

    pub(crate) fn mode(&self) -> AuthMode {
        match self {
            Credentials::None => AuthMode::None,
            Credentials::Basic { .. } => AuthMode::Basic,
            Credentials::Digest { .. } => AuthMode::Digest,
        }
    }
}

// Keep passwords out of Debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => f.write_str("None"),
            Credentials::Basic { user, .. } => write!(f, "Basic({})", user),
            Credentials::Digest { user, .. } => write!(f, "Digest({})", user),
        }
    }
}

/// Hash algorithm named by a Digest challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl DigestAlgorithm {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(DigestAlgorithm::Md5),
            "MD5-SESS" => Ok(DigestAlgorithm::Md5Sess),
            "SHA-256" => Ok(DigestAlgorithm::Sha256),
            "SHA-256-SESS" => Ok(DigestAlgorithm::Sha256Sess),
            other => Err(DocStoreError::DigestChallenge(format!(
                "unsupported algorithm {}",
                other
            ))),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Md5Sess => "MD5-sess",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha256Sess => "SHA-256-sess",
        }
    }

    fn is_session(&self) -> bool {
        matches!(self, DigestAlgorithm::Md5Sess | DigestAlgorithm::Sha256Sess)
    }

    fn hash(&self, data: &str) -> String {
        match self {
            DigestAlgorithm::Md5 | DigestAlgorithm::Md5Sess => {
                hex::encode(Md5::digest(data.as_bytes()))
            }
            DigestAlgorithm::Sha256 | DigestAlgorithm::Sha256Sess => {
                hex::encode(Sha256::digest(data.as_bytes()))
            }
        }
    }
}

/// A parsed `WWW-Authenticate: Digest` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// `Some("auth")` when the server offers it; `None` for legacy servers
    pub qop: Option<String>,
    pub algorithm: DigestAlgorithm,
}

impl DigestChallenge {
    /// Pick the first Digest challenge out of a set of header values
    pub fn from_headers<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut last_err = None;
        for value in values {
            match Self::parse(value) {
                Ok(challenge) => return Ok(challenge),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            DocStoreError::DigestChallenge("401 without WWW-Authenticate".to_string())
        }))
    }

    /// Parse a single header value such as
    /// `Digest realm="public", qop="auth", nonce="...", opaque="..."`
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(char::is_whitespace).unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("digest") {
            return Err(DocStoreError::DigestChallenge(format!(
                "expected Digest scheme, got {}",
                scheme
            )));
        }

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop_offered = None;
        let mut algorithm = DigestAlgorithm::Md5;

        for (key, value) in parse_params(rest) {
            match key.as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => qop_offered = Some(value),
                "algorithm" => algorithm = DigestAlgorithm::parse(&value)?,
                _ => {}
            }
        }

        let qop = match qop_offered {
            None => None,
            Some(offered) => {
                if offered.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")) {
                    Some("auth".to_string())
                } else {
                    return Err(DocStoreError::DigestChallenge(format!(
                        "no supported qop in '{}'",
                        offered
                    )));
                }
            }
        };

        Ok(Self {
            realm: realm.ok_or_else(|| missing("realm"))?,
            nonce: nonce.ok_or_else(|| missing("nonce"))?,
            opaque,
            qop,
            algorithm,
        })
    }

    /// Build the `Authorization` header value for one request.
    ///
    /// `uri` is the request target exactly as sent: path plus query.
    pub fn respond(
        &self,
        user: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
        nc: u32,
    ) -> String {
        let alg = self.algorithm;
        let mut ha1 = alg.hash(&format!("{}:{}:{}", user, self.realm, password));
        if alg.is_session() {
            ha1 = alg.hash(&format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = alg.hash(&format!("{}:{}", method, uri));
        let nc = format!("{:08x}", nc);

        let response = match &self.qop {
            Some(qop) => alg.hash(&format!(
                "{}:{}:{}:{}:{}:{}",
                ha1, self.nonce, nc, cnonce, qop, ha2
            )),
            None => alg.hash(&format!("{}:{}:{}", ha1, self.nonce, ha2)),
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
            quote(user),
            quote(&self.realm),
            quote(&self.nonce),
            quote(uri),
            alg.name(),
            response
        );
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque=\"{}\"", quote(opaque)));
        }
        if let Some(qop) = &self.qop {
            header.push_str(&format!(", qop={}, nc={}, cnonce=\"{}\"", qop, nc, cnonce));
        }
        header
    }
}

/// Fresh client nonce for a Digest response
pub(crate) fn new_cnonce() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}

fn missing(field: &str) -> DocStoreError {
    DocStoreError::DigestChallenge(format!("challenge has no {}", field))
}

fn quote(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Split `key=value, key="quoted, value"` auth-params
fn parse_params(s: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = s.trim();

    while !rest.is_empty() {
        let eq = match (rest.find('='), rest.find(',')) {
            // bare token such as `userhash`; no value to keep
            (Some(eq), Some(comma)) if comma < eq => {
                rest = rest[comma + 1..].trim_start();
                continue;
            }
            (Some(eq), _) => eq,
            (None, _) => break,
        };
        let key = rest[..eq].trim().to_ascii_lowercase();
        rest = rest[eq + 1..].trim_start();

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let mut value = String::new();
            let mut end = quoted.len();
            let mut escaped = false;
            for (i, c) in quoted.char_indices() {
                if escaped {
                    value.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    end = i + 1;
                    break;
                } else {
                    value.push(c);
                }
            }
            rest = &quoted[end..];
            value
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            let value = rest[..end].trim().to_string();
            rest = &rest[end..];
            value
        };

        rest = rest.trim_start().trim_start_matches(',').trim_start();
        params.push((key, value));
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_from_config() {
        let config = ClientConfig {
            auth: "basic".into(),
            user: Some("admin".into()),
            password: Some("pw".into()),
            ..Default::default()
        };
        let creds = Credentials::from_config(&config).unwrap();
        assert_eq!(creds.mode(), AuthMode::Basic);
        assert_eq!(format!("{:?}", creds), "Basic(admin)");
    }

    #[test]
    fn test_credentials_require_user() {
        let config = ClientConfig {
            auth: "digest".into(),
            user: None,
            ..Default::default()
        };
        let err = Credentials::from_config(&config).unwrap_err();
        assert!(matches!(err, DocStoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_none_needs_no_user() {
        let config = ClientConfig {
            auth: "none".into(),
            ..Default::default()
        };
        assert_eq!(Credentials::from_config(&config).unwrap().mode(), AuthMode::None);
    }

    #[test]
    fn test_parse_challenge() {
        let challenge = DigestChallenge::parse(
            r#"Digest realm="public", qop="auth,auth-int", nonce="abc123", opaque="xyz", algorithm=MD5-sess"#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "public");
        assert_eq!(challenge.nonce, "abc123");
        assert_eq!(challenge.opaque.as_deref(), Some("xyz"));
        assert_eq!(challenge.qop.as_deref(), Some("auth"));
        assert_eq!(challenge.algorithm, DigestAlgorithm::Md5Sess);
    }

    #[test]
    fn test_parse_challenge_rejects_other_schemes() {
        assert!(DigestChallenge::parse(r#"Basic realm="public""#).is_err());
        assert!(DigestChallenge::parse(r#"Digest nonce="n""#).is_err());
        assert!(DigestChallenge::parse(r#"Digest realm="r", nonce="n", qop="auth-int""#).is_err());
    }

    #[test]
    fn test_parse_challenge_with_bare_token() {
        let challenge =
            DigestChallenge::parse(r#"Digest realm="r", userhash, nonce="n", stale"#).unwrap();
        assert_eq!(challenge.realm, "r");
        assert_eq!(challenge.nonce, "n");
    }

    #[test]
    fn test_from_headers_skips_basic() {
        let challenge = DigestChallenge::from_headers([
            r#"Basic realm="public""#,
            r#"Digest realm="public", nonce="n1""#,
        ])
        .unwrap();
        assert_eq!(challenge.nonce, "n1");
        assert_eq!(challenge.qop, None);
    }

    #[test]
    fn test_rfc2617_reference_response() {
        let challenge = DigestChallenge::parse(
            r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        )
        .unwrap();
        let header = challenge.respond(
            "Mufasa",
            "Circle Of Life",
            "GET",
            "/dir/index.html",
            "0a4f113b",
            1,
        );
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
        assert!(header.contains("nc=00000001"));
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
        assert!(header.starts_with(r#"Digest username="Mufasa""#));
    }

    #[test]
    fn test_rfc7616_sha256_reference_response() {
        let challenge = DigestChallenge::parse(
            r#"Digest realm="http-auth@example.org", qop="auth, auth-int", algorithm=SHA-256, nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v", opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS""#,
        )
        .unwrap();
        let header = challenge.respond(
            "Mufasa",
            "Circle of Life",
            "GET",
            "/dir/index.html",
            "f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ",
            1,
        );
        assert!(header.contains(
            r#"response="753927fa0e85d155564e2e272a28d1802ca10daf4496794697cf8db5856cb6c1""#
        ));
        assert!(header.contains("algorithm=SHA-256"));
    }

    #[test]
    fn test_cnonce_is_fresh() {
        let a = new_cnonce();
        assert_eq!(a.len(), 16);
        assert_ne!(a, new_cnonce());
    }
}
