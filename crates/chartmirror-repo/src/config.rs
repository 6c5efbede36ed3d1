//! Repository configuration for one mirror run

use std::path::{Path, PathBuf};
use url::Url;

use crate::credentials::Credentials;
use crate::error::{RepoError, Result};

/// Name of the index document, both remote and mirrored
pub const INDEX_FILE: &str = "index.yaml";

/// Client-side TLS material, all PEM encoded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsFiles {
    /// Extra CA bundle trusted for the origin
    pub ca_file: Option<PathBuf>,

    /// Client certificate
    pub cert_file: Option<PathBuf>,

    /// Private key for `cert_file`
    pub key_file: Option<PathBuf>,
}

impl TlsFiles {
    pub fn is_empty(&self) -> bool {
        self.ca_file.is_none() && self.cert_file.is_none() && self.key_file.is_none()
    }
}

/// Where to mirror from and to
///
/// Built once by the caller and owned by the mirror service for the run.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Origin repository URL, without trailing slash
    pub url: String,

    /// Origin URL exactly as given; this is what a root rewrite replaces
    pub origin: String,

    /// Absolute destination directory
    pub destination: PathBuf,

    /// Basic auth credentials for the origin
    pub credentials: Option<Credentials>,

    /// TLS material
    pub tls: TlsFiles,
}

impl RepositoryConfig {
    /// Validate and create a configuration
    ///
    /// The URL must parse and use an http(s) scheme. The destination must be
    /// absolute; it is not created here.
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Result<Self> {
        let url = url.into();
        validate_http_url(&url)?;

        let destination = destination.into();
        if !destination.is_absolute() {
            return Err(RepoError::InvalidDestination {
                path: destination,
                reason: "path must be absolute".to_string(),
            });
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            origin: url,
            destination,
            credentials: None,
            tls: TlsFiles::default(),
        })
    }

    /// Attach basic auth credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Attach TLS material
    pub fn with_tls(mut self, tls: TlsFiles) -> Self {
        self.tls = tls;
        self
    }

    /// URL of the remote index document
    pub fn index_url(&self) -> String {
        format!("{}/{}", self.url, INDEX_FILE)
    }

    /// Resolve an archive URL from the index; relative URLs are taken
    /// relative to the origin
    pub fn resolve_url(&self, url: &str) -> Result<String> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute.to_string());
        }

        let base = Url::parse(&format!("{}/", self.url))?;
        Ok(base.join(url)?.to_string())
    }

    /// Destination path of an archive, always directly inside the destination
    ///
    /// Index records come from the remote side, so a name or version that
    /// would leave the destination directory is refused.
    pub fn archive_path(&self, name: &str, version: &str) -> Result<PathBuf> {
        let unsafe_part = |part: &str| {
            part.is_empty() || part == "." || part == ".." || part.contains(['/', '\\', '\0'])
        };
        if unsafe_part(name) || unsafe_part(version) {
            return Err(RepoError::UnsafeArchiveName {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        Ok(self
            .destination
            .join(chartmirror_core::archive::archive_file_name(name, version)))
    }

    /// Destination path of the mirrored index
    pub fn index_path(&self) -> PathBuf {
        self.destination.join(INDEX_FILE)
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// Check that `url` parses and its scheme is http-like
pub fn validate_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| RepoError::InvalidRepositoryUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !parsed.scheme().contains("http") {
        return Err(RepoError::InvalidRepositoryUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}', expected http or https", parsed.scheme()),
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = RepositoryConfig::new("https://charts.example.com/stable/", "/tmp/mirror").unwrap();
        assert_eq!(config.url, "https://charts.example.com/stable");
        assert_eq!(config.index_url(), "https://charts.example.com/stable/index.yaml");
        assert_eq!(config.index_path(), PathBuf::from("/tmp/mirror/index.yaml"));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            RepositoryConfig::new("not a url", "/tmp/m").unwrap_err(),
            RepoError::InvalidRepositoryUrl { .. }
        ));
        assert!(matches!(
            RepositoryConfig::new("ftp://charts.example.com", "/tmp/m").unwrap_err(),
            RepoError::InvalidRepositoryUrl { .. }
        ));
        assert!(matches!(
            RepositoryConfig::new("https://charts.example.com", "relative/dir").unwrap_err(),
            RepoError::InvalidDestination { .. }
        ));
    }

    #[test]
    fn test_resolve_url() {
        let config = RepositoryConfig::new("https://charts.example.com/stable", "/tmp/m").unwrap();

        assert_eq!(
            config.resolve_url("charts/web-1.0.0.tgz").unwrap(),
            "https://charts.example.com/stable/charts/web-1.0.0.tgz"
        );
        assert_eq!(
            config.resolve_url("https://cdn.example.com/web-1.0.0.tgz").unwrap(),
            "https://cdn.example.com/web-1.0.0.tgz"
        );
    }

    #[test]
    fn test_archive_path() {
        let config = RepositoryConfig::new("http://127.0.0.1:8080", "/srv/mirror").unwrap();
        assert_eq!(
            config.archive_path("chart2", "0.0.0-rc1").unwrap(),
            PathBuf::from("/srv/mirror/chart2-0.0.0-rc1.tgz")
        );
    }

    #[test]
    fn test_archive_path_stays_in_destination() {
        let config = RepositoryConfig::new("http://127.0.0.1:8080", "/srv/mirror").unwrap();
        for (name, version) in [
            ("../../escaped", "1"),
            ("chart", "../1.0.0"),
            ("sub/chart", "1.0.0"),
            ("chart", "1.0.0\\..\\x"),
            ("..", "1"),
            ("", "1.0.0"),
            ("chart", ""),
        ] {
            assert!(
                matches!(
                    config.archive_path(name, version),
                    Err(RepoError::UnsafeArchiveName { .. })
                ),
                "{}@{}",
                name,
                version
            );
        }
        // dots inside a component are fine
        assert!(config.archive_path("chart..x", "1.0.0-rc.1").is_ok());
    }

    #[test]
    fn test_origin_kept_as_given() {
        let config = RepositoryConfig::new("https://charts.example.com/stable/", "/tmp/m").unwrap();
        assert_eq!(config.origin, "https://charts.example.com/stable/");
        assert_eq!(config.url, "https://charts.example.com/stable");
    }
}
