//! Error types for repository operations

use std::path::PathBuf;
use thiserror::Error;

/// Broad classes of failure, used to pick exit codes and tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input, always reported before any I/O
    Validation,
    /// Remote fetches and TLS setup
    Network,
    /// Local filesystem
    Io,
    /// Index documents
    Parse,
}

/// Repository operation errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Validation Errors ============
    #[error("Invalid repository URL: {url} - {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    #[error("Invalid destination {path}: {reason}")]
    InvalidDestination { path: PathBuf, reason: String },

    #[error("Invalid chart name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("A chart version ({version}) was given without a chart name")]
    VersionWithoutName { version: String },

    #[error("Version not found: {name}@{version}")]
    VersionNotFound { name: String, version: String },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {url}")]
    HttpError { status: u16, url: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Authentication required for {url}")]
    AuthRequired { url: String },

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    #[error("Cannot load TLS material from {path}: {message}")]
    Tls { path: PathBuf, message: String },

    #[error("Integrity check failed for {name}: expected {expected}, got {actual}")]
    IntegrityCheckFailed {
        name: String,
        expected: String,
        actual: String,
    },

    // ============ Index Errors ============
    #[error("Index parse error: {message}")]
    IndexParseError { message: String },

    // ============ IO Errors ============
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to write archive for {name}@{version}: name or version is not a plain file name component")]
    UnsafeArchiveName { name: String, version: String },

    #[error("Cannot move index from {from} to {to}: {source}")]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RepoError {
    /// Which class this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRepositoryUrl { .. }
            | Self::InvalidDestination { .. }
            | Self::InvalidPattern { .. }
            | Self::VersionWithoutName { .. }
            | Self::VersionNotFound { .. } => ErrorCategory::Validation,
            Self::HttpError { .. }
            | Self::NetworkError { .. }
            | Self::Timeout { .. }
            | Self::AuthRequired { .. }
            | Self::AuthFailed { .. }
            | Self::Tls { .. }
            | Self::IntegrityCheckFailed { .. } => ErrorCategory::Network,
            Self::IndexParseError { .. } => ErrorCategory::Parse,
            Self::Write { .. }
            | Self::UnsafeArchiveName { .. }
            | Self::Relocate { .. }
            | Self::Io(_) => ErrorCategory::Io,
        }
    }
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RepoError::Timeout { seconds: 30 }
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidRepositoryUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            RepoError::VersionWithoutName {
                version: "1.0.0".to_string()
            }
            .category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            RepoError::HttpError {
                status: 404,
                url: "http://repo/a.tgz".to_string()
            }
            .category(),
            ErrorCategory::Network
        );
        assert_eq!(
            RepoError::IndexParseError {
                message: "bad".to_string()
            }
            .category(),
            ErrorCategory::Parse
        );
        assert_eq!(
            RepoError::Io(std::io::Error::other("disk")).category(),
            ErrorCategory::Io
        );
    }
}
