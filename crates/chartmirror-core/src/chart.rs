//! Chart definition and loading

use serde::{Deserialize, Serialize};
use semver::Version;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::archive;
use crate::error::{CoreError, Result};
use crate::values::Values;

/// Name of the chart metadata file
pub const CHART_FILE: &str = "Chart.yaml";

/// Suffix that identifies packaged chart archives
pub const ARCHIVE_SUFFIX: &str = ".tgz";

/// Chart metadata as found in `Chart.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    /// API version (v1 or v2)
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Chart name (required)
    pub name: String,

    /// Chart version (required, SemVer)
    #[serde(with = "version_serde")]
    pub version: Version,

    /// Chart type
    #[serde(default, rename = "type")]
    pub kind: ChartKind,

    /// Description
    #[serde(default)]
    pub description: Option<String>,

    /// Application version
    #[serde(default)]
    pub app_version: Option<String>,

    /// Kubernetes version constraint
    #[serde(default)]
    pub kube_version: Option<String>,

    /// Home URL
    #[serde(default)]
    pub home: Option<String>,

    /// Icon URL
    #[serde(default)]
    pub icon: Option<String>,

    /// Source URLs
    #[serde(default)]
    pub sources: Vec<String>,

    /// Keywords
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Maintainers
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,

    /// Dependencies
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Deprecated flag
    #[serde(default)]
    pub deprecated: bool,

    /// Annotations
    #[serde(default)]
    pub annotations: std::collections::BTreeMap<String, String>,
}

fn default_api_version() -> String {
    "v2".to_string()
}

/// Chart type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Application,
    Library,
}

/// Maintainer information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Chart dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// Dependency name
    pub name: String,

    /// Version constraint
    #[serde(default)]
    pub version: Option<String>,

    /// Repository URL
    #[serde(default)]
    pub repository: Option<String>,

    /// Comma separated list of value paths, the first one that resolves decides
    #[serde(default)]
    pub condition: Option<String>,

    /// Tags for conditional inclusion
    #[serde(default)]
    pub tags: Vec<String>,

    /// Alias name (overrides dependency name in values)
    #[serde(default)]
    pub alias: Option<String>,
}

impl Dependency {
    /// Get the effective name (alias if set, otherwise name)
    #[inline]
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Check if the dependency is enabled for the given parent values
    ///
    /// A missing condition, or a condition none of whose paths resolve,
    /// leaves the dependency enabled.
    pub fn is_enabled(&self, values: &serde_json::Value) -> bool {
        let Some(condition) = &self.condition else {
            return true;
        };

        condition
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .find_map(|path| lookup_path(path, values))
            .map(is_truthy)
            .unwrap_or(true)
    }
}

/// Resolve a dot-path such as `redis.enabled` against values
fn lookup_path<'a>(path: &str, values: &'a serde_json::Value) -> Option<&'a serde_json::Value> {
    path.split('.')
        .try_fold(values, |current, part| current.get(part))
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.is_empty() && s != "false" && s != "0",
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

/// Loaded chart with resolved paths
#[derive(Debug, Clone)]
pub struct LoadedChart {
    /// Chart metadata
    pub chart: Chart,

    /// Root directory of the chart
    pub root: PathBuf,

    /// Templates directory
    pub templates_dir: PathBuf,

    /// Values file path
    pub values_path: PathBuf,

    /// Subcharts directory (if present)
    pub charts_dir: Option<PathBuf>,

    /// Keeps the extraction directory alive for charts loaded from archives
    extracted: Option<Arc<TempDir>>,
}

impl LoadedChart {
    /// Load a chart from a directory or a packaged archive
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let metadata = std::fs::metadata(path).map_err(|_| CoreError::ChartNotFound {
            path: path.display().to_string(),
        })?;

        if metadata.is_dir() {
            Self::load_dir(path)
        } else {
            Self::load_archive(path)
        }
    }

    /// Load a chart from an unpacked directory
    pub fn load_dir<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();

        if !root.exists() {
            return Err(CoreError::ChartNotFound {
                path: root.display().to_string(),
            });
        }

        let chart_file = root.join(CHART_FILE);
        if !chart_file.is_file() {
            return Err(CoreError::InvalidChart {
                message: format!("{} not found in {}", CHART_FILE, root.display()),
            });
        }

        let content = std::fs::read_to_string(&chart_file)?;
        let chart: Chart = serde_yaml::from_str(&content)?;

        if chart.name.trim().is_empty() {
            return Err(CoreError::InvalidChart {
                message: format!("{} has an empty name", chart_file.display()),
            });
        }

        if !matches!(chart.api_version.as_str(), "v1" | "v2") {
            return Err(CoreError::InvalidChart {
                message: format!(
                    "Unsupported apiVersion {} in {}. Expected v1 or v2",
                    chart.api_version,
                    chart_file.display()
                ),
            });
        }

        let charts_dir = {
            let dir = root.join("charts");
            if dir.is_dir() { Some(dir) } else { None }
        };

        Ok(Self {
            chart,
            templates_dir: root.join("templates"),
            values_path: root.join("values.yaml"),
            charts_dir,
            root,
            extracted: None,
        })
    }

    /// Load a chart from a `.tgz` archive
    ///
    /// The archive is unpacked into a temporary directory that lives as long
    /// as the returned chart (and its clones).
    pub fn load_archive<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let dir = tempfile::Builder::new().prefix("chartmirror-").tempdir()?;

        archive::extract_archive(path, dir.path()).map_err(|e| CoreError::Archive {
            message: format!("{}: {}", path.display(), e),
        })?;

        let root = find_chart_root(dir.path()).ok_or_else(|| CoreError::InvalidChart {
            message: format!("{} does not contain a {}", path.display(), CHART_FILE),
        })?;

        tracing::trace!(archive = %path.display(), root = %root.display(), "unpacked chart");

        let mut loaded = Self::load_dir(&root)?;
        loaded.extracted = Some(Arc::new(dir));
        Ok(loaded)
    }

    /// Whether this chart was loaded from an archive
    pub fn is_packaged(&self) -> bool {
        self.extracted.is_some()
    }

    /// Default values from `values.yaml`, empty when the file is absent
    pub fn default_values(&self) -> Result<Values> {
        if !self.values_path.exists() {
            return Ok(Values::new());
        }

        let values = Values::from_file(&self.values_path)?;
        if values.inner().is_null() {
            Ok(Values::new())
        } else {
            Ok(values)
        }
    }

    /// Get list of template files
    pub fn template_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if !self.templates_dir.exists() {
            return Ok(files);
        }

        for entry in walkdir::WalkDir::new(&self.templates_dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if matches!(
                        ext.as_str(),
                        "yaml" | "yml" | "j2" | "jinja2" | "tpl" | "txt" | "json"
                    ) {
                        files.push(path.to_path_buf());
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Subchart sources under `charts/`: directories and packaged archives
    ///
    /// Sorted for deterministic rendering order.
    pub fn subchart_paths(&self) -> Result<Vec<PathBuf>> {
        let Some(charts_dir) = &self.charts_dir else {
            return Ok(Vec::new());
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(charts_dir)? {
            let path = entry?.path();
            let is_archive = path
                .file_name()
                .map(|n| n.to_string_lossy().ends_with(ARCHIVE_SUFFIX))
                .unwrap_or(false);

            if (path.is_dir() && path.join(CHART_FILE).is_file()) || (path.is_file() && is_archive)
            {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Find the dependency declaration matching a subchart name
    pub fn dependency_for(&self, name: &str) -> Option<&Dependency> {
        self.chart.dependencies.iter().find(|d| d.name == name)
    }
}

/// Locate the chart root inside an unpacked archive
///
/// Packaged charts usually hold a single top-level directory named after the
/// chart; archives with `Chart.yaml` at the top are accepted too.
fn find_chart_root(dir: &Path) -> Option<PathBuf> {
    if dir.join(CHART_FILE).is_file() {
        return Some(dir.to_path_buf());
    }

    let mut candidates = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && p.join(CHART_FILE).is_file());

    let first = candidates.next()?;
    if candidates.next().is_some() {
        return None;
    }
    Some(first)
}

/// Custom serde for semver::Version
mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(s.trim_start_matches('v')).map_err(serde::de::Error::custom)
    }
}
