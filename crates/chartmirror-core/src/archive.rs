//! Chart archive creation and extraction
//!
//! Charts are distributed as gzip-compressed tarballs (`<name>-<version>.tgz`)
//! holding a single top-level directory named after the chart.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tar::{Archive, Builder, Header};

use crate::chart::ARCHIVE_SUFFIX;
use crate::error::Result;

/// Extract an archive to a destination directory
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    std::fs::create_dir_all(dest)?;

    archive.unpack(dest)?;

    Ok(())
}

/// Create a tar.gz archive holding every file below `src_dir`
///
/// Paths inside the archive are relative to `src_dir`, so packing the parent
/// of a chart directory yields the conventional `<chart>/Chart.yaml` layout.
pub fn create_archive(src_dir: &Path, output: &Path) -> Result<()> {
    let file = File::create(output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    let mut files: Vec<_> = walkdir::WalkDir::new(src_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();

    for file_path in files {
        let rel_path = file_path
            .strip_prefix(src_dir)
            .unwrap_or(&file_path)
            .to_string_lossy()
            .replace('\\', "/");
        let content = std::fs::read(&file_path)?;
        add_bytes_to_archive(&mut builder, &rel_path, &content)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    Ok(())
}

/// Whether a file name looks like a packaged chart
#[must_use]
pub fn is_chart_archive(file_name: &str) -> bool {
    file_name.contains(ARCHIVE_SUFFIX)
}

/// Canonical archive file name for a chart version
#[must_use]
pub fn archive_file_name(name: &str, version: &str) -> String {
    format!("{}-{}{}", name, version, ARCHIVE_SUFFIX)
}

/// Add bytes to a tar archive with a given path
fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0); // Reproducible builds: use epoch time
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content)?;

    Ok(())
}
