//! Subchart discovery
//!
//! Subcharts live under a chart's `charts/` directory, either unpacked or as
//! `.tgz` archives. Each one is matched against the parent's dependency list
//! to find its alias and condition.

use chartmirror_core::{Dependency, LoadedChart};
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use crate::error::{EngineError, Result};

/// Maximum nesting of subcharts before rendering gives up on a branch
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// A subchart found under `charts/`
#[derive(Debug)]
pub struct SubchartInfo {
    /// Name used for value scoping (alias if set, otherwise chart name)
    pub name: String,

    /// Where the subchart was loaded from
    pub path: PathBuf,

    /// Loaded chart
    pub chart: LoadedChart,

    /// Whether the dependency condition holds for the parent values
    pub enabled: bool,
}

/// Load and classify every subchart of `parent`
///
/// `parent_values` are the parent's computed values; dependency conditions
/// are resolved against them.
pub fn discover_subcharts(
    parent: &LoadedChart,
    parent_values: &JsonValue,
) -> Result<Vec<SubchartInfo>> {
    let paths = parent.subchart_paths().map_err(|source| EngineError::Chart {
        path: parent.root.display().to_string(),
        source,
    })?;

    let mut subcharts = Vec::with_capacity(paths.len());
    for path in paths {
        let chart = LoadedChart::load(&path).map_err(|source| EngineError::Chart {
            path: path.display().to_string(),
            source,
        })?;

        let dependency: Option<&Dependency> = parent.dependency_for(&chart.chart.name);
        let name = dependency
            .map(|d| d.effective_name().to_string())
            .unwrap_or_else(|| chart.chart.name.clone());
        let enabled = dependency
            .map(|d| d.is_enabled(parent_values))
            .unwrap_or(true);

        if !enabled {
            tracing::debug!(subchart = %name, parent = %parent.chart.name, "subchart disabled by condition");
        }

        subcharts.push(SubchartInfo {
            name,
            path,
            chart,
            enabled,
        });
    }

    Ok(subcharts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_chart(dir: &Path, chart_yaml: &str) {
        std::fs::create_dir_all(dir.join("templates")).unwrap();
        std::fs::write(dir.join("Chart.yaml"), chart_yaml).unwrap();
    }

    #[test]
    fn test_discover_with_alias_and_condition() {
        let temp = TempDir::new().unwrap();
        write_chart(
            temp.path(),
            r#"
name: app
version: 1.0.0
dependencies:
  - name: postgresql
    alias: db
    condition: db.enabled
"#,
        );
        write_chart(
            &temp.path().join("charts").join("postgresql"),
            "name: postgresql\nversion: 12.0.0\n",
        );
        write_chart(
            &temp.path().join("charts").join("redis"),
            "name: redis\nversion: 17.0.0\n",
        );

        let parent = LoadedChart::load(temp.path()).unwrap();
        let found = discover_subcharts(&parent, &json!({"db": {"enabled": false}})).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "db");
        assert!(!found[0].enabled);
        assert_eq!(found[1].name, "redis");
        assert!(found[1].enabled);
    }

    #[test]
    fn test_broken_subchart_is_an_error() {
        let temp = TempDir::new().unwrap();
        write_chart(temp.path(), "name: app\nversion: 1.0.0\n");
        std::fs::create_dir_all(temp.path().join("charts")).unwrap();
        std::fs::write(temp.path().join("charts").join("bad-1.0.0.tgz"), b"nope").unwrap();

        let parent = LoadedChart::load(temp.path()).unwrap();
        let err = discover_subcharts(&parent, &json!({})).unwrap_err();
        assert!(matches!(err, EngineError::Chart { .. }));
    }
}
