//! Inspect-images command - list the container images charts deploy

use console::style;
use std::path::Path;

use chartmirror_engine::{ImagesService, InspectOptions};

use crate::GlobalArgs;
use crate::error::{CliError, Result};
use crate::output::OutputSink;

pub const LONG_ABOUT: &str = "\
Extract all the images of the chart, or of the charts in the folder provided.
Images are printed on stdout by default; see --output for other formats.

    chartmirror inspect-images /srv/charts
    chartmirror inspect-images /srv/charts/app-1.0.0.tgz -o skopeo=sync.yaml

The target has to be a full path. --output takes KIND[=FILE], FILE
defaulting to images.out:

    file    one image per line
    json    JSON array
    yaml    YAML sequence
    skopeo  source file for 'skopeo sync --src yaml'
    stdout  one image per line on standard output";

pub fn run(target: &Path, output: &str, global: GlobalArgs) -> Result<()> {
    if !target.is_absolute() {
        return Err(CliError::validation_with_help(
            format!("target must be a full path: {}", target.display()),
            "pass the chart folder or archive as an absolute path",
        ));
    }

    let sink = OutputSink::parse(output)?;

    let options = InspectOptions {
        verbose: global.verbose,
        ignore_errors: global.ignore_errors,
    };
    let scan = ImagesService::new(options).run(target)?;

    if scan.exit_with_errors {
        tracing::warn!(
            target = %target.display(),
            "some charts could not be processed and were skipped"
        );
    }

    sink.output(&scan.images)?;

    if let Some(path) = sink.path() {
        eprintln!(
            "{} {} images to {}",
            style("Wrote").green().bold(),
            scan.images.len(),
            path.display()
        );
    }

    Ok(())
}
