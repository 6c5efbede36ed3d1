//! Template rendering context

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::chart::{Chart, ChartKind};
use crate::values::Values;

/// Release name used when rendering charts offline
pub const DEFAULT_RELEASE_NAME: &str = "release-name";

/// Namespace used when rendering charts offline
pub const DEFAULT_NAMESPACE: &str = "default";

/// Context available to all templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    /// Normalized values
    pub values: JsonValue,

    /// Chart metadata
    pub chart: ChartInfo,

    /// Release information
    pub release: ReleaseInfo,

    /// Cluster capabilities
    pub capabilities: Capabilities,

    /// Current template info
    pub template: TemplateInfo,
}

/// Chart information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartInfo {
    pub name: String,
    pub version: String,
    pub app_version: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ChartKind,
}

impl From<&Chart> for ChartInfo {
    fn from(chart: &Chart) -> Self {
        Self {
            name: chart.name.clone(),
            version: chart.version.to_string(),
            app_version: chart.app_version.clone(),
            description: chart.description.clone(),
            kind: chart.kind.clone(),
        }
    }
}

/// Release information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Revision number
    pub revision: u32,

    /// Is this an install operation?
    pub is_install: bool,

    /// Is this an upgrade operation?
    pub is_upgrade: bool,

    /// Service (always "chartmirror")
    pub service: String,
}

impl ReleaseInfo {
    /// Create release info for a first install
    pub fn for_install(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            revision: 1,
            is_install: true,
            is_upgrade: false,
            service: "chartmirror".to_string(),
        }
    }
}

impl Default for ReleaseInfo {
    fn default() -> Self {
        Self::for_install(DEFAULT_RELEASE_NAME, DEFAULT_NAMESPACE)
    }
}

/// Cluster capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Kubernetes version
    pub kube_version: KubeVersion,

    /// Available API versions
    pub api_versions: Vec<String>,
}

/// Kubernetes version info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeVersion {
    pub version: String,
    pub major: String,
    pub minor: String,
}

impl Default for KubeVersion {
    fn default() -> Self {
        Self {
            version: "v1.28.0".to_string(),
            major: "1".to_string(),
            minor: "28".to_string(),
        }
    }
}

/// Current template information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    /// Template path relative to the chart root
    pub name: String,

    /// Templates directory relative to the chart root
    pub base_path: String,
}

impl TemplateContext {
    /// Create a context for a chart, normalizing null leaves in `values`
    pub fn new(values: &Values, chart: &Chart) -> Self {
        Self {
            values: values.normalized().into_inner(),
            chart: ChartInfo::from(chart),
            release: ReleaseInfo::default(),
            capabilities: Capabilities::default(),
            template: TemplateInfo::default(),
        }
    }

    /// Set the current template info
    pub fn with_template(mut self, name: &str, base_path: &str) -> Self {
        self.template = TemplateInfo {
            name: name.to_string(),
            base_path: base_path.to_string(),
        };
        self
    }

    /// Convert to minijinja-compatible context
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> Chart {
        serde_yaml::from_str("name: web\nversion: 1.0.0\nappVersion: \"2.0\"\n").unwrap()
    }

    #[test]
    fn test_template_context() {
        let values = Values::from_yaml("replicas: 3\ntag: null\n").unwrap();
        let ctx = TemplateContext::new(&values, &chart());

        assert_eq!(ctx.chart.name, "web");
        assert_eq!(ctx.chart.app_version.as_deref(), Some("2.0"));
        assert_eq!(ctx.release.name, DEFAULT_RELEASE_NAME);
        assert_eq!(ctx.release.service, "chartmirror");
        assert!(ctx.release.is_install);
        assert_eq!(ctx.values["tag"], "");
    }

    #[test]
    fn test_context_json_keys() {
        let ctx = TemplateContext::new(&Values::new(), &chart())
            .with_template("web/templates/pod.yaml", "web/templates");
        let json = ctx.to_json();

        for key in ["values", "chart", "release", "capabilities", "template"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["chart"]["appVersion"], "2.0");
        assert_eq!(json["chart"]["type"], "application");
        assert_eq!(json["template"]["basePath"], "web/templates");
        assert_eq!(json["capabilities"]["kubeVersion"]["minor"], "28");
    }
}
