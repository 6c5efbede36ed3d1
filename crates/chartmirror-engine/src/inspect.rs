//! Image inspection of chart targets
//!
//! `ImagesService` decides whether a target path is one chart or a directory
//! of charts, renders what it finds and collects image references.

use std::path::{Path, PathBuf};

use chartmirror_core::archive::is_chart_archive;

use crate::chart_renderer::ChartRenderer;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::images::ImageScanner;

/// Per-run settings for image inspection
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    /// Log every processed target
    pub verbose: bool,

    /// Skip charts that fail to load or render instead of aborting
    pub ignore_errors: bool,
}

/// Outcome of an inspection run
#[derive(Debug, Clone, Default)]
pub struct ImageScan {
    /// Image references in discovery order, duplicates kept
    pub images: Vec<String>,

    /// A directory walk found at least one chart archive
    pub has_archive_matches: bool,

    /// Some archives failed and were skipped
    pub exit_with_errors: bool,
}

/// Walks a target and scans every chart it denotes
#[derive(Debug)]
pub struct ImagesService {
    options: InspectOptions,
    renderer: ChartRenderer,
    scanner: ImageScanner,
    has_archive_matches: bool,
    exit_with_errors: bool,
}

impl ImagesService {
    /// Create a service; charts render leniently when errors are ignored
    pub fn new(options: InspectOptions) -> Self {
        let engine = Engine::builder().strict(!options.ignore_errors).build();
        Self {
            renderer: ChartRenderer::new(engine),
            scanner: ImageScanner::new(),
            has_archive_matches: false,
            exit_with_errors: false,
            options,
        }
    }

    /// Inspect `target`, a chart archive, a chart directory or a directory
    /// holding chart archives at any depth
    pub fn run(mut self, target: &Path) -> Result<ImageScan> {
        let metadata = std::fs::metadata(target).map_err(|source| {
            tracing::error!(target = %target.display(), "cannot read target");
            EngineError::Io {
                path: target.display().to_string(),
                source,
            }
        })?;

        if metadata.is_dir() {
            self.process_directory(target)?;
        } else {
            self.process_target(target)?;
        }

        Ok(ImageScan {
            images: self.scanner.into_images(),
            has_archive_matches: self.has_archive_matches,
            exit_with_errors: self.exit_with_errors,
        })
    }

    /// Try the directory as one chart, then fall back to the archives in it
    fn process_directory(&mut self, target: &Path) -> Result<()> {
        let whole = match self.process_target(target) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        tracing::debug!(
            target = %target.display(),
            error = %whole,
            "target is not a chart, looking for chart archives"
        );

        for archive in find_archives(target)? {
            self.has_archive_matches = true;

            if let Err(e) = self.process_target(&archive) {
                if self.options.ignore_errors {
                    tracing::warn!(archive = %archive.display(), error = %e, "skipping chart");
                    self.exit_with_errors = true;
                } else {
                    tracing::error!(archive = %archive.display(), "cannot load chart");
                    return Err(e);
                }
            }
        }

        if !self.has_archive_matches {
            tracing::error!(target = %target.display(), "cannot load chart");
            return Err(whole);
        }

        Ok(())
    }

    fn process_target(&mut self, target: &Path) -> Result<()> {
        if self.options.verbose {
            tracing::info!(target = %target.display(), "processing target");
        }

        let manifests = self.renderer.render_path(target)?;
        self.scanner.scan_manifests(&manifests);
        Ok(())
    }
}

/// Every file below `root` whose name contains `.tgz`, in walk order
fn find_archives(root: &Path) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();

    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string());
            tracing::error!(path = %path, "cannot access directory");
            EngineError::Io {
                path,
                source: e.into(),
            }
        })?;

        if entry.file_type().is_file() && is_chart_archive(&entry.file_name().to_string_lossy()) {
            archives.push(entry.into_path());
        }
    }

    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartmirror_core::archive::create_archive;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn chart_dir(root: &Path, name: &str, image: &str) {
        write(
            root,
            "Chart.yaml",
            &format!("apiVersion: v2\nname: {}\nversion: 1.0.0\n", name),
        );
        write(root, "values.yaml", &format!("image: {}\n", image));
        write(
            root,
            "templates/deployment.yaml",
            "spec:\n  containers:\n    - name: main\n      image: \"{{ values.image }}\"\n",
        );
    }

    fn packaged_chart(dest: &Path, name: &str, image: &str) -> PathBuf {
        let staging = TempDir::new().unwrap();
        chart_dir(&staging.path().join(name), name, image);
        let archive = dest.join(format!("{}-1.0.0.tgz", name));
        std::fs::create_dir_all(dest).unwrap();
        create_archive(staging.path(), &archive).unwrap();
        archive
    }

    fn options(ignore_errors: bool) -> InspectOptions {
        InspectOptions {
            verbose: false,
            ignore_errors,
        }
    }

    #[test]
    fn test_single_archive() {
        let temp = TempDir::new().unwrap();
        let archive = packaged_chart(temp.path(), "web", "nginx:1.25");

        let scan = ImagesService::new(options(false)).run(&archive).unwrap();
        assert_eq!(scan.images, vec!["nginx:1.25"]);
        assert!(!scan.has_archive_matches);
        assert!(!scan.exit_with_errors);
    }

    #[test]
    fn test_chart_directory() {
        let temp = TempDir::new().unwrap();
        chart_dir(temp.path(), "web", "nginx:1.25");

        let scan = ImagesService::new(options(false)).run(temp.path()).unwrap();
        assert_eq!(scan.images, vec!["nginx:1.25"]);
        assert!(!scan.has_archive_matches);
    }

    #[test]
    fn test_directory_of_archives_including_nested() {
        let temp = TempDir::new().unwrap();
        packaged_chart(temp.path(), "alpha", "alpha:1");
        packaged_chart(&temp.path().join("nested").join("deeper"), "beta", "beta:2");
        write(temp.path(), "index.yaml", "apiVersion: v1\nentries: {}\n");

        let scan = ImagesService::new(options(false)).run(temp.path()).unwrap();
        assert_eq!(scan.images, vec!["alpha:1", "beta:2"]);
        assert!(scan.has_archive_matches);
        assert!(!scan.exit_with_errors);
    }

    #[test]
    fn test_broken_archive_tolerated() {
        let temp = TempDir::new().unwrap();
        packaged_chart(temp.path(), "alpha", "alpha:1");
        write(temp.path(), "broken-0.1.0.tgz", "not an archive");

        let scan = ImagesService::new(options(true)).run(temp.path()).unwrap();
        assert_eq!(scan.images, vec!["alpha:1"]);
        assert!(scan.has_archive_matches);
        assert!(scan.exit_with_errors);
    }

    #[test]
    fn test_broken_archive_fatal() {
        let temp = TempDir::new().unwrap();
        packaged_chart(temp.path(), "alpha", "alpha:1");
        write(temp.path(), "broken-0.1.0.tgz", "not an archive");

        let err = ImagesService::new(options(false)).run(temp.path()).unwrap_err();
        assert!(matches!(err, EngineError::Chart { .. }));
    }

    #[test]
    fn test_empty_directory_surfaces_chart_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "README.md", "nothing here");

        let err = ImagesService::new(options(true)).run(temp.path()).unwrap_err();
        assert!(matches!(err, EngineError::Chart { .. }));
    }

    #[test]
    fn test_missing_target() {
        let err = ImagesService::new(options(true))
            .run(Path::new("/no/such/target"))
            .unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_lenient_render_under_ignore_errors() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Chart.yaml", "name: web\nversion: 1.0.0\n");
        write(
            temp.path(),
            "templates/pod.yaml",
            "image: {{ values.image.repository }}:{{ values.image.tag }}\n",
        );

        assert!(ImagesService::new(options(false)).run(temp.path()).is_err());

        let scan = ImagesService::new(options(true)).run(temp.path()).unwrap();
        assert_eq!(scan.images, vec![":"]);
    }
}
