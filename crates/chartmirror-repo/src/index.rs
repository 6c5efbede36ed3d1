//! Repository index types
//!
//! Helm-compatible `index.yaml`. Only the fields the mirror reads are
//! required; everything else is carried for completeness.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::error::{RepoError, Result};

/// Repository index (Helm-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryIndex {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// When this index was generated
    #[serde(default)]
    pub generated: Option<DateTime<Utc>>,

    /// Records keyed by chart name, names in ascending order
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<IndexEntry>>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

impl RepositoryIndex {
    /// Parse index from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RepoError::IndexParseError {
            message: e.to_string(),
        })
    }

    /// Parse index from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let yaml = std::str::from_utf8(bytes).map_err(|e| RepoError::IndexParseError {
            message: format!("Invalid UTF-8: {}", e),
        })?;
        Self::from_yaml(yaml)
    }

    /// Total number of records across all charts
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One chart version in the index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Chart name
    pub name: String,

    /// Chart version
    pub version: String,

    /// Archive digest, hex SHA-256 (optionally `sha256:`-prefixed)
    #[serde(default)]
    pub digest: Option<String>,

    /// Creation timestamp
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    /// Archive URLs, tried in order
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default)]
    pub app_version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub home: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub annotations: HashMap<String, String>,

    #[serde(default)]
    pub api_version: Option<String>,

    /// Chart type (application or library)
    #[serde(default)]
    pub r#type: Option<String>,
}

/// Semver order; parseable versions outrank unparseable ones, which
/// compare lexically among themselves
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (Version::parse(a).ok(), Version::parse(b).ok()) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}
