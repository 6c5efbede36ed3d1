//! Chart renderer with subchart support
//!
//! `ChartRenderer` renders a chart's default values through its templates and
//! recurses into every enabled subchart with values scoped under the
//! subchart's name.

use indexmap::IndexMap;
use chartmirror_core::{LoadedChart, TemplateContext, Values};
use std::path::Path;

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::subchart::{DEFAULT_MAX_DEPTH, discover_subcharts};

/// Rendered documents keyed by name, in template path order
pub type Manifests = IndexMap<String, String>;

/// Renders charts and their subcharts
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    engine: Engine,
    max_depth: usize,
}

impl ChartRenderer {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set maximum depth for nested subcharts
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Load a chart directory or archive and render it
    pub fn render_path(&self, path: &Path) -> Result<Manifests> {
        let chart = LoadedChart::load(path).map_err(|source| EngineError::Chart {
            path: path.display().to_string(),
            source,
        })?;
        self.render(&chart)
    }

    /// Render a loaded chart with its own default values
    pub fn render(&self, chart: &LoadedChart) -> Result<Manifests> {
        let values = chart.default_values().map_err(|source| EngineError::Chart {
            path: chart.values_path.display().to_string(),
            source,
        })?;
        self.render_recursive(chart, values, 0)
    }

    fn render_recursive(&self, chart: &LoadedChart, values: Values, depth: usize) -> Result<Manifests> {
        let mut manifests = Manifests::new();

        if depth > self.max_depth {
            tracing::warn!(
                chart = %chart.chart.name,
                max_depth = self.max_depth,
                "maximum subchart depth exceeded, not descending further"
            );
            return Ok(manifests);
        }

        for subchart in discover_subcharts(chart, values.inner())? {
            if !subchart.enabled {
                continue;
            }

            let defaults = subchart
                .chart
                .default_values()
                .map_err(|source| EngineError::Chart {
                    path: subchart.path.display().to_string(),
                    source,
                })?;
            let scoped = Values::for_subchart(defaults, &values, &subchart.name);

            let rendered = self.render_recursive(&subchart.chart, scoped, depth + 1)?;
            for (name, document) in rendered {
                manifests.insert(format!("{}/charts/{}", chart.chart.name, name), document);
            }
        }

        let context = TemplateContext::new(&values, &chart.chart);
        let own = self
            .engine
            .render_chart(chart, &context)
            .map_err(|source| EngineError::Template {
                chart: chart.chart.name.clone(),
                source,
            })?;
        manifests.extend(own);

        Ok(manifests)
    }
}
