//! Credential scoping and the HTTP client that honours it
//!
//! Key security features:
//! - Credentials scoped to the origin (scheme, host, port and path prefix)
//! - NEVER sends credentials after cross-origin redirect
//! - Optional CA bundle and client certificate for private repositories

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::config::TlsFiles;
use crate::error::{RepoError, Result};

/// Request timeout applied to every fetch
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

const MAX_REDIRECTS: u32 = 10;

/// Basic authentication credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value of the `Authorization` header
    pub fn auth_header(&self) -> String {
        let encoded = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            format!("{}:{}", self.username, self.password),
        );
        format!("Basic {}", encoded)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Scoped credentials - maps URL prefixes to credentials
/// SECURITY: Never sends credentials to URLs outside the scope
#[derive(Debug, Clone, Default)]
pub struct ScopedCredentials {
    scopes: HashMap<String, Credentials>,
}

impl ScopedCredentials {
    /// Add credentials for a URL scope
    pub fn add(&mut self, url_prefix: &str, credentials: Credentials) {
        let prefix = url_prefix.trim_end_matches('/').to_string();
        self.scopes.insert(prefix, credentials);
    }

    /// Get credentials for a URL (by longest matching scope)
    pub fn for_url(&self, url: &str) -> Option<&Credentials> {
        let target = Url::parse(url).ok()?;
        self.scopes
            .iter()
            .filter(|(prefix, _)| Self::in_scope(prefix, &target))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, creds)| creds)
    }

    /// Same origin, and the path sits under the scope path on a `/` boundary
    fn in_scope(prefix: &str, target: &Url) -> bool {
        let Ok(scope) = Url::parse(prefix) else {
            return false;
        };
        if !Self::same_origin(scope.as_str(), target.as_str()) {
            return false;
        }

        let base = scope.path().trim_end_matches('/');
        base.is_empty()
            || target
                .path()
                .strip_prefix(base)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Check if two URLs are same-origin (for redirect safety)
    pub fn same_origin(url1: &str, url2: &str) -> bool {
        match (Url::parse(url1), Url::parse(url2)) {
            (Ok(u1), Ok(u2)) => {
                u1.scheme() == u2.scheme()
                    && u1.host() == u2.host()
                    && u1.port_or_known_default() == u2.port_or_known_default()
            }
            _ => false,
        }
    }
}

/// Secure HTTP client wrapper with redirect protection
#[derive(Debug, Clone)]
pub struct SecureHttpClient {
    client: reqwest::Client,
    credentials: ScopedCredentials,
}

impl SecureHttpClient {
    /// Create a client, loading any TLS material up front
    pub fn new(credentials: ScopedCredentials, tls: &TlsFiles) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            // Redirects are followed by hand so credentials never leak
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("chartmirror/", env!("CARGO_PKG_VERSION")));

        if let Some(ca_file) = &tls.ca_file {
            let pem = read_pem(ca_file)?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| RepoError::Tls {
                path: ca_file.clone(),
                message: e.to_string(),
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        match (&tls.cert_file, &tls.key_file) {
            (Some(cert_file), Some(key_file)) => {
                let mut pem = read_pem(cert_file)?;
                pem.push(b'\n');
                pem.extend(read_pem(key_file)?);
                let identity = reqwest::Identity::from_pem(&pem).map_err(|e| RepoError::Tls {
                    path: cert_file.clone(),
                    message: e.to_string(),
                })?;
                builder = builder.identity(identity);
            }
            (Some(path), None) | (None, Some(path)) => {
                return Err(RepoError::Tls {
                    path: path.clone(),
                    message: "client certificate and key must be given together".to_string(),
                });
            }
            (None, None) => {}
        }

        let client = builder.build().map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Fetch a URL with secure redirect handling
    ///
    /// SECURITY: Credentials are NEVER sent after cross-origin redirects
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let original_url = url.to_string();
        let mut current_url = original_url.clone();
        let mut redirects = 0;

        loop {
            let mut request = self.client.get(&current_url);

            if ScopedCredentials::same_origin(&original_url, &current_url) {
                if let Some(creds) = self.credentials.for_url(&current_url) {
                    request = request.header(reqwest::header::AUTHORIZATION, creds.auth_header());
                }
            } else {
                tracing::warn!(
                    "Cross-origin redirect from {} to {} - credentials not forwarded",
                    original_url,
                    current_url
                );
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_redirection() {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(RepoError::NetworkError {
                        message: format!("Too many redirects (max {})", MAX_REDIRECTS),
                    });
                }

                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| RepoError::NetworkError {
                        message: "Redirect without Location header".to_string(),
                    })?;

                current_url = Url::parse(&current_url)?.join(location)?.to_string();
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(RepoError::AuthRequired { url: current_url });
            }
            if status == reqwest::StatusCode::FORBIDDEN {
                return Err(RepoError::AuthFailed {
                    message: format!("Access denied to {}", current_url),
                });
            }
            if !status.is_success() {
                return Err(RepoError::HttpError {
                    status: status.as_u16(),
                    url: current_url,
                });
            }

            return Ok(response);
        }
    }

    /// Fetch bytes from URL
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| RepoError::Tls {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
