//! Where `inspect-images` sends the image list

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// File written when `-o KIND` carries no `=FILE`
pub const DEFAULT_IMAGES_FILE: &str = "images.out";

const DOCKER_HUB: &str = "docker.io";
const DEFAULT_TAG: &str = "latest";

/// Output destination and format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// One image per line
    File(PathBuf),
    /// JSON array of strings
    Json(PathBuf),
    /// YAML sequence of strings
    Yaml(PathBuf),
    /// `skopeo sync --src yaml` source document
    Skopeo(PathBuf),
    /// One image per line on standard output
    Stdout,
}

impl OutputSink {
    /// Parse `KIND[=FILE]`; unknown kinds fall back to stdout
    pub fn parse(spec: &str) -> Result<Self> {
        let (kind, file) = match spec.split_once('=') {
            Some((kind, file)) if !file.is_empty() => (kind, file),
            Some((kind, _)) => (kind, DEFAULT_IMAGES_FILE),
            None => (spec, DEFAULT_IMAGES_FILE),
        };

        let path = std::path::absolute(file).map_err(|e| CliError::io_at(Path::new(file), e))?;

        Ok(match kind.trim() {
            "file" => Self::File(path),
            "json" => Self::Json(path),
            "yaml" => Self::Yaml(path),
            "skopeo" => Self::Skopeo(path),
            _ => Self::Stdout,
        })
    }

    /// File the sink writes to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(p) | Self::Json(p) | Self::Yaml(p) | Self::Skopeo(p) => Some(p),
            Self::Stdout => None,
        }
    }

    /// Serialize `images` in this sink's format
    pub fn render(&self, images: &[String]) -> Result<String> {
        match self {
            Self::File(_) | Self::Stdout => Ok(images.iter().map(|i| format!("{}\n", i)).collect()),
            Self::Json(_) => serde_json::to_string_pretty(images)
                .map(|json| json + "\n")
                .map_err(|e| CliError::internal(format!("cannot encode images as JSON: {}", e))),
            Self::Yaml(_) => serde_yaml::to_string(images)
                .map_err(|e| CliError::internal(format!("cannot encode images as YAML: {}", e))),
            Self::Skopeo(_) => serde_yaml::to_string(&skopeo_document(images))
                .map_err(|e| CliError::internal(format!("cannot encode skopeo source: {}", e))),
        }
    }

    /// Deliver `images`
    pub fn output(&self, images: &[String]) -> Result<()> {
        let content = self.render(images)?;
        match self.path() {
            Some(path) => {
                std::fs::write(path, content).map_err(|e| CliError::io_at(path, e))?;
                tracing::debug!(path = %path.display(), images = images.len(), "images written");
            }
            None => print!("{}", content),
        }
        Ok(())
    }
}

/// Images of one registry, keyed by repository
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct SkopeoRegistry {
    pub images: BTreeMap<String, Vec<String>>,
}

/// Group image references into `registry -> images -> repository -> tags`
pub fn skopeo_document(images: &[String]) -> BTreeMap<String, SkopeoRegistry> {
    let mut document: BTreeMap<String, SkopeoRegistry> = BTreeMap::new();

    for image in images {
        let Some(reference) = ImageReference::parse(image) else {
            tracing::debug!(image = %image, "skipping unparseable image reference");
            continue;
        };

        let tags = document
            .entry(reference.registry)
            .or_default()
            .images
            .entry(reference.repository)
            .or_default();
        if !tags.contains(&reference.tag) {
            tags.push(reference.tag);
        }
    }

    document
}

/// A container image reference split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    /// Tag or `sha256:` digest
    pub tag: String,
}

impl ImageReference {
    /// Split a reference; Docker Hub defaults apply where parts are missing
    pub fn parse(image: &str) -> Option<Self> {
        let image = image.trim();

        let (name, tag) = match image.split_once('@') {
            Some((name, digest)) => (strip_tag(name).0, digest.to_string()),
            None => {
                let (name, tag) = strip_tag(image);
                (name, tag.unwrap_or(DEFAULT_TAG).to_string())
            }
        };

        let (registry, repository) = match name.split_once('/') {
            Some((first, rest)) if is_registry_host(first) => (first, rest.to_string()),
            _ => (DOCKER_HUB, name.to_string()),
        };

        if repository.is_empty() || tag.is_empty() {
            return None;
        }

        let repository = if registry == DOCKER_HUB && !repository.contains('/') {
            format!("library/{}", repository)
        } else {
            repository
        };

        Some(Self {
            registry: registry.to_string(),
            repository,
            tag,
        })
    }
}

/// Split `name[:tag]`; a colon before the last `/` is a registry port
fn strip_tag(image: &str) -> (&str, Option<&str>) {
    match image.rfind(':') {
        Some(i) if !image[i..].contains('/') => {
            let tag = &image[i + 1..];
            (&image[..i], (!tag.is_empty()).then_some(tag))
        }
        _ => (image, None),
    }
}

fn is_registry_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}
