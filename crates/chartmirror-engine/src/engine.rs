//! Template engine based on MiniJinja

use indexmap::IndexMap;
use minijinja::Environment;
use chartmirror_core::{ChartKind, LoadedChart, TemplateContext};

use crate::error::TemplateError;
use crate::filters;
use crate::functions;

/// File that holds post-install notes, never part of the manifests
const NOTES_FILE: &str = "NOTES.txt";

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Build the engine
    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// The template engine
#[derive(Debug, Clone)]
pub struct Engine {
    strict_mode: bool,
}

impl Engine {
    /// Create a new engine
    ///
    /// In lenient mode undefined values, and attributes of undefined values,
    /// render as empty strings instead of failing.
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    /// Create a builder
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn is_strict(&self) -> bool {
        self.strict_mode
    }

    /// Create a configured MiniJinja environment
    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        if self.strict_mode {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Chainable);
        }

        // Manifests are YAML, never escape
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("indent", filters::indent);
        env.add_filter("required", filters::required);
        env.add_filter("empty", filters::empty);
        env.add_filter("haskey", filters::haskey);
        env.add_filter("sha256", filters::sha256sum);
        env.add_filter("trunc", filters::trunc);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);

        env.add_function("fail", functions::fail);
        env.add_function("dict", functions::dict);
        env.add_function("list", functions::list);
        env.add_function("get", functions::get);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);
        env.add_function("printf", functions::printf);
        env.add_function("tpl", functions::tpl);

        env
    }

    /// Render a single template string
    pub fn render_string(
        &self,
        template: &str,
        context: &TemplateContext,
        template_name: &str,
    ) -> Result<String, TemplateError> {
        let mut env = self.create_environment();

        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template))?;

        let tmpl = env
            .get_template(template_name)
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template))?;

        tmpl.render(context.to_json())
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template))
    }

    /// Render the templates of one chart, without its subcharts
    ///
    /// Documents are keyed `<chart>/templates/<relative path>` and kept in
    /// template path order. Helpers (`_*`), `NOTES.txt` and documents that
    /// render to nothing are left out. Library charts only provide helpers
    /// and never produce documents.
    pub fn render_chart(
        &self,
        chart: &LoadedChart,
        context: &TemplateContext,
    ) -> Result<IndexMap<String, String>, TemplateError> {
        let mut manifests = IndexMap::new();

        if chart.chart.kind == ChartKind::Library {
            return Ok(manifests);
        }

        let template_files = chart.template_files().map_err(|e| {
            TemplateError::simple(format!("Failed to list templates: {}", e))
        })?;

        let mut env = self.create_environment();
        let mut sources = Vec::with_capacity(template_files.len());

        // Load everything first so helpers can be included from any template
        for file_path in &template_files {
            let rel_path = file_path
                .strip_prefix(&chart.templates_dir)
                .unwrap_or(file_path)
                .to_string_lossy()
                .replace('\\', "/");
            let content = std::fs::read_to_string(file_path).map_err(|e| {
                TemplateError::simple(format!("Failed to read {}: {}", file_path.display(), e))
            })?;

            env.add_template_owned(rel_path.clone(), content.clone())
                .map_err(|e| TemplateError::from_minijinja(e, &rel_path, &content))?;
            sources.push((rel_path, content));
        }

        let base_path = format!("{}/templates", chart.chart.name);

        for (rel_path, content) in &sources {
            let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
            if file_name.starts_with('_') || file_name == NOTES_FILE {
                continue;
            }

            let document_name = format!("{}/{}", base_path, rel_path);
            let ctx = context
                .clone()
                .with_template(&document_name, &base_path)
                .to_json();

            let tmpl = env
                .get_template(rel_path)
                .map_err(|e| TemplateError::from_minijinja(e, rel_path, content))?;
            let rendered = tmpl
                .render(ctx)
                .map_err(|e| TemplateError::from_minijinja(e, rel_path, content))?;

            let trimmed = rendered.trim();
            if trimmed.is_empty() || trimmed == "---" {
                continue;
            }

            tracing::trace!(document = %document_name, "rendered template");
            manifests.insert(document_name, rendered);
        }

        Ok(manifests)
    }
}
